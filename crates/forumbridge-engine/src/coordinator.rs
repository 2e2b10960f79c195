// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Origin -> destination synchronization.
//!
//! A pass walks every configured (or visible) space with bounded parallelism.
//! Each space is synced under its own lock: GROUP spaces map to a category with
//! one topic per thread, DIRECT spaces map to one DM chat channel. Every
//! successful destination write is recorded in the mapping store before the
//! next dependent write, and the per-space cursor only advances past messages
//! that were all processed.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use forumbridge_config::model::{ForumbridgeConfig, IdentityConfig, SpaceBinding};
use forumbridge_core::{
    ActingIdentity, CategoryRequest, Container, DestinationWriter, FailureScope, MappingKind,
    MappingStore, Message, OriginWriter, SourceReader, Space, SpaceKind, SyncError, Thread,
};
use futures::StreamExt;
use futures::stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::classifier::classify;
use crate::content::{BatchProgress, attributed, sort_messages, topic_body, topic_title};
use crate::identity::IdentityResolver;
use crate::locks::KeyedLocks;

/// Engine behavior derived from configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Destination username of the service identity.
    pub service_username: String,
    pub max_parallel_spaces: usize,
    /// Sync every visible space, not only bound ones.
    pub sync_all_spaces: bool,
    pub bindings: Vec<SpaceBinding>,
    pub identity: IdentityConfig,
}

impl EngineSettings {
    pub fn from_config(config: &ForumbridgeConfig) -> Self {
        Self {
            service_username: config.discourse.api_username.clone(),
            max_parallel_spaces: config.service.max_parallel_spaces.max(1),
            sync_all_spaces: config.service.sync_all_spaces,
            bindings: config.mappings.clone(),
            identity: config.identity.clone(),
        }
    }

    fn binding(&self, space_id: &str) -> Option<&SpaceBinding> {
        self.bindings.iter().find(|b| b.space_id == space_id)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&ForumbridgeConfig::default())
    }
}

/// Outcome of syncing one space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpaceReport {
    pub space_id: String,
    pub kind: Option<SpaceKind>,
    /// Destination entities created (topics, posts, chat messages).
    pub created: usize,
    /// Messages already mapped or without content.
    pub skipped: usize,
    /// Messages whose creation failed and will be retried next pass.
    pub failed: usize,
    /// The space is gone from the origin and was not synced.
    pub inactive: bool,
    /// Work stopped early on shutdown; the cursor was left in place.
    pub cancelled: bool,
    /// Cursor value after this sync, if it advanced.
    pub cursor: Option<DateTime<Utc>>,
}

impl SpaceReport {
    fn new(space_id: &str) -> Self {
        Self {
            space_id: space_id.to_string(),
            ..Self::default()
        }
    }
}

/// A space whose sync was aborted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceFailure {
    pub space_id: String,
    pub error: String,
}

/// Outcome of one catch-up pass.
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    pub spaces: Vec<SpaceReport>,
    pub failures: Vec<SpaceFailure>,
}

impl PassReport {
    pub fn created(&self) -> usize {
        self.spaces.iter().map(|s| s.created).sum()
    }

    pub fn failed_entities(&self) -> usize {
        self.spaces.iter().map(|s| s.failed).sum()
    }

    pub fn space(&self, space_id: &str) -> Option<&SpaceReport> {
        self.spaces.iter().find(|s| s.space_id == space_id)
    }
}

/// The synchronization and identity-mapping engine.
pub struct SyncEngine {
    pub(crate) source: Arc<dyn SourceReader>,
    pub(crate) origin: Arc<dyn OriginWriter>,
    pub(crate) destination: Arc<dyn DestinationWriter>,
    pub(crate) store: Arc<dyn MappingStore>,
    pub(crate) identities: IdentityResolver,
    pub(crate) space_locks: KeyedLocks,
    pub(crate) settings: EngineSettings,
}

impl SyncEngine {
    pub fn new(
        source: Arc<dyn SourceReader>,
        origin: Arc<dyn OriginWriter>,
        destination: Arc<dyn DestinationWriter>,
        store: Arc<dyn MappingStore>,
        settings: EngineSettings,
    ) -> Self {
        let identities =
            IdentityResolver::new(store.clone(), destination.clone(), settings.identity.clone());
        Self {
            source,
            origin,
            destination,
            store,
            identities,
            space_locks: KeyedLocks::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Space IDs a pass covers: configured bindings first, then, in
    /// sync-all mode, every other visible space.
    pub async fn spaces_to_sync(&self) -> Result<Vec<String>, SyncError> {
        let mut ids: Vec<String> = self
            .settings
            .bindings
            .iter()
            .map(|b| b.space_id.clone())
            .collect();
        if self.settings.sync_all_spaces {
            for space in self.source.list_spaces().await? {
                if !ids.contains(&space.id) {
                    ids.push(space.id);
                }
            }
        }
        Ok(ids)
    }

    /// Runs one catch-up pass over every space.
    ///
    /// Space failures are collected in the report. A pass-scope failure
    /// (`Unauthorized`, storage) stops the remaining spaces and is returned.
    pub async fn run_pass(&self, cancel: &CancellationToken) -> Result<PassReport, SyncError> {
        let space_ids = self.spaces_to_sync().await?;
        if space_ids.is_empty() {
            warn!("no spaces to sync: configure [[mappings]] or enable service.sync_all_spaces");
            return Ok(PassReport::default());
        }
        info!(spaces = space_ids.len(), "starting sync pass");

        let pass_cancel = cancel.child_token();
        let results: Vec<(String, Result<SpaceReport, SyncError>)> = stream::iter(space_ids)
            .map(|space_id| {
                let pass_cancel = &pass_cancel;
                async move {
                    let result = self.sync_space(&space_id, pass_cancel).await;
                    if let Err(e) = &result
                        && e.scope() == FailureScope::Pass
                    {
                        pass_cancel.cancel();
                    }
                    (space_id, result)
                }
            })
            .buffer_unordered(self.settings.max_parallel_spaces.max(1))
            .collect()
            .await;

        let mut report = PassReport::default();
        let mut fatal = None;
        for (space_id, result) in results {
            match result {
                Ok(space_report) => report.spaces.push(space_report),
                Err(e) if e.scope() == FailureScope::Pass => {
                    error!(space_id = %space_id, error = %e, "sync pass aborted");
                    fatal.get_or_insert(e);
                }
                Err(e) => {
                    error!(space_id = %space_id, error = %e, "space sync failed");
                    report.failures.push(SpaceFailure {
                        space_id,
                        error: e.to_string(),
                    });
                }
            }
        }
        if let Some(e) = fatal {
            return Err(e);
        }

        info!(
            spaces = report.spaces.len(),
            failed_spaces = report.failures.len(),
            created = report.created(),
            failed_entities = report.failed_entities(),
            "sync pass complete"
        );
        Ok(report)
    }

    /// Syncs one space under its lock and advances its cursor.
    pub async fn sync_space(
        &self,
        space_id: &str,
        cancel: &CancellationToken,
    ) -> Result<SpaceReport, SyncError> {
        let mut report = SpaceReport::new(space_id);
        if cancel.is_cancelled() {
            report.cancelled = true;
            return Ok(report);
        }
        if self.store.is_space_inactive(space_id).await? {
            debug!(space_id, "skipping inactive space");
            report.inactive = true;
            return Ok(report);
        }

        let _guard = self.space_locks.lock(space_id).await;
        let space = match self.source.get_space(space_id).await {
            Ok(space) => space,
            Err(SyncError::NotFound { resource }) => {
                return self.retire_space(report, &resource).await;
            }
            Err(e) => return Err(escalate(e, space_id)),
        };
        let kind = classify(&space)?;
        report.kind = Some(kind);

        let since = self.store.get_cursor(space_id).await?;
        let mut progress = BatchProgress::new();
        let synced = match kind {
            SpaceKind::Group => {
                self.sync_group(&space, since, cancel, &mut progress, &mut report)
                    .await
            }
            SpaceKind::Direct => {
                self.sync_direct(&space, since, cancel, &mut progress, &mut report)
                    .await
            }
        };
        match synced {
            Ok(()) => {}
            // The space vanished between get_space and listing its content.
            Err(SyncError::NotFound { resource }) => {
                return self.retire_space(report, &resource).await;
            }
            Err(e) => return Err(e),
        }

        // Spaces interrupted by shutdown may have unfetched content older
        // than what was processed, so their cursor stays put.
        if !report.cancelled
            && let Some(cursor) = progress.safe_cursor()
        {
            self.store.advance_cursor(space_id, cursor).await?;
            report.cursor = Some(cursor);
        }

        info!(
            space_id,
            kind = %kind,
            created = report.created,
            skipped = report.skipped,
            failed = report.failed,
            "space synced"
        );
        Ok(report)
    }

    /// Marks a space that no longer exists on the origin as inactive.
    async fn retire_space(
        &self,
        mut report: SpaceReport,
        resource: &str,
    ) -> Result<SpaceReport, SyncError> {
        let space_id = report.space_id.clone();
        warn!(
            space_id = %space_id,
            resource,
            "space no longer exists on origin, marking inactive"
        );
        self.store
            .mark_space_inactive(&space_id, "not found on origin")
            .await?;
        report.inactive = true;
        Ok(report)
    }

    async fn sync_group(
        &self,
        space: &Space,
        since: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
        progress: &mut BatchProgress,
        report: &mut SpaceReport,
    ) -> Result<(), SyncError> {
        let category_id = self.ensure_category(space).await?;
        let threads = self
            .source
            .list_threads(&space.id, since)
            .await
            .map_err(|e| listing_error(e, &space.id))?;
        debug!(space_id = %space.id, threads = threads.len(), "threads active since cursor");

        for thread in &threads {
            if cancel.is_cancelled() {
                report.cancelled = true;
                return Ok(());
            }
            let container = Container::Thread {
                space_id: space.id.clone(),
                thread_id: thread.id.clone(),
            };
            let mut messages = self
                .source
                .list_messages(&container, since)
                .await
                .map_err(|e| listing_error(e, &space.id))?;
            sort_messages(&mut messages);
            self.sync_thread(&category_id, thread, &messages, cancel, progress, report)
                .await?;
        }
        Ok(())
    }

    async fn sync_thread(
        &self,
        category_id: &str,
        thread: &Thread,
        messages: &[Message],
        cancel: &CancellationToken,
        progress: &mut BatchProgress,
        report: &mut SpaceReport,
    ) -> Result<(), SyncError> {
        let mut topic_id = self
            .store
            .get_destination(MappingKind::ThreadTopic, &thread.id)
            .await?;

        for (index, message) in messages.iter().enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                return Ok(());
            }
            if self
                .already_processed(MappingKind::MessagePost, message, progress, report)
                .await?
            {
                continue;
            }

            let result = match topic_id.clone() {
                None => match self.create_topic(category_id, thread, message).await {
                    Ok(created) => {
                        topic_id = Some(created);
                        Ok(())
                    }
                    Err(e) => Err(e),
                },
                Some(topic) => self.create_post(&topic, thread, message).await,
            };

            match result {
                Ok(()) => {
                    progress.succeeded(message.created_at);
                    report.created += 1;
                }
                Err(e) if e.scope() == FailureScope::Entity => {
                    progress.failed(message.created_at);
                    report.failed += 1;
                    if topic_id.is_none() {
                        warn!(
                            thread_id = %thread.id,
                            message_id = %message.id,
                            error = %e,
                            "topic creation failed, skipping rest of thread"
                        );
                        progress.failed_all(&messages[index + 1..]);
                        return Ok(());
                    }
                    warn!(message_id = %message.id, error = %e, "post creation failed");
                }
                Err(e) => return Err(escalate(e, &thread.space_id)),
            }
        }
        Ok(())
    }

    async fn sync_direct(
        &self,
        space: &Space,
        since: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
        progress: &mut BatchProgress,
        report: &mut SpaceReport,
    ) -> Result<(), SyncError> {
        let mut messages = self
            .source
            .list_messages(&Container::Space(space.id.clone()), since)
            .await
            .map_err(|e| listing_error(e, &space.id))?;
        sort_messages(&mut messages);
        if messages.is_empty() {
            return Ok(());
        }

        // Participants are discovered from message authors.
        let mut seen = HashSet::new();
        let mut handles = Vec::new();
        for message in &messages {
            if message.sender.is_bot || !seen.insert(message.sender.id.as_str()) {
                continue;
            }
            let handle = self
                .identities
                .resolve(&message.sender)
                .await
                .map_err(|e| escalate(e, &space.id))?;
            if !handles.contains(&handle) {
                handles.push(handle);
            }
        }

        let mut channel_id = self
            .store
            .get_destination(MappingKind::SpaceChannel, &space.id)
            .await?;

        for message in &messages {
            if cancel.is_cancelled() {
                report.cancelled = true;
                return Ok(());
            }
            if self
                .already_processed(MappingKind::MessageChatMessage, message, progress, report)
                .await?
            {
                continue;
            }

            let channel = match channel_id.clone() {
                Some(channel) => channel,
                None if handles.is_empty() => {
                    debug!(
                        space_id = %space.id,
                        "no human participants yet, deferring channel creation"
                    );
                    progress.failed(message.created_at);
                    continue;
                }
                None => {
                    let created = self.ensure_channel(space, &handles).await?;
                    channel_id = Some(created.clone());
                    created
                }
            };

            match self.create_chat_message(&channel, space, message).await {
                Ok(()) => {
                    progress.succeeded(message.created_at);
                    report.created += 1;
                }
                Err(e) if e.scope() == FailureScope::Entity => {
                    progress.failed(message.created_at);
                    report.failed += 1;
                    warn!(message_id = %message.id, error = %e, "chat message creation failed");
                }
                Err(e) => return Err(escalate(e, &space.id)),
            }
        }
        Ok(())
    }

    /// Returns true for messages that need no destination write: already
    /// mapped, or without text.
    async fn already_processed(
        &self,
        kind: MappingKind,
        message: &Message,
        progress: &mut BatchProgress,
        report: &mut SpaceReport,
    ) -> Result<bool, SyncError> {
        let done = message.text.trim().is_empty()
            || self.store.get_destination(kind, &message.id).await?.is_some();
        if done {
            progress.succeeded(message.created_at);
            report.skipped += 1;
        }
        Ok(done)
    }

    async fn ensure_category(&self, space: &Space) -> Result<String, SyncError> {
        if let Some(category_id) = self
            .store
            .get_destination(MappingKind::SpaceCategory, &space.id)
            .await?
        {
            return Ok(category_id);
        }

        let binding = self.settings.binding(&space.id);
        let name = if space.display_name.trim().is_empty() {
            space.id.clone()
        } else {
            space.display_name.clone()
        };
        let request = CategoryRequest {
            space_id: space.id.clone(),
            name,
            category_id: binding.and_then(|b| b.category_id).map(|id| id.to_string()),
            parent_category_id: binding
                .and_then(|b| b.parent_category_id)
                .map(|id| id.to_string()),
        };
        let category_id = self
            .destination
            .find_or_create_category(&request, &ActingIdentity::Service)
            .await
            .map_err(|e| escalate(e, &space.id))?;
        let category_id = self
            .persist(MappingKind::SpaceCategory, &space.id, &category_id, None)
            .await?;
        info!(space_id = %space.id, category_id = %category_id, "space mapped to category");
        Ok(category_id)
    }

    async fn ensure_channel(&self, space: &Space, handles: &[String]) -> Result<String, SyncError> {
        let channel_id = self
            .destination
            .create_dm_channel(handles, &ActingIdentity::Service)
            .await
            .map_err(|e| escalate(e, &space.id))?;
        let channel_id = self
            .persist(MappingKind::SpaceChannel, &space.id, &channel_id, None)
            .await?;
        info!(
            space_id = %space.id,
            channel_id = %channel_id,
            participants = handles.len(),
            "space mapped to DM channel"
        );
        Ok(channel_id)
    }

    async fn create_topic(
        &self,
        category_id: &str,
        thread: &Thread,
        message: &Message,
    ) -> Result<String, SyncError> {
        let (acting, text) = self.authored(message).await?;
        let title = topic_title(&message.text);
        let body = topic_body(&title, &text);
        let created = self
            .destination
            .create_topic(category_id, &title, &body, &acting)
            .await?;
        let recorded = self
            .store
            .insert_topic(
                (&thread.id, &created.topic_id),
                (&message.id, &created.post_id),
                &thread.space_id,
            )
            .await;
        let topic_id = match recorded {
            Ok(()) => created.topic_id,
            Err(SyncError::MappingConflict { existing, .. }) => {
                warn!(
                    thread_id = %thread.id,
                    ours = %created.topic_id,
                    existing = %existing,
                    "thread already mapped, adopting existing topic"
                );
                existing
            }
            Err(e) => return Err(e),
        };
        debug!(thread_id = %thread.id, topic_id = %topic_id, "thread mapped to topic");
        Ok(topic_id)
    }

    async fn create_post(
        &self,
        topic_id: &str,
        thread: &Thread,
        message: &Message,
    ) -> Result<(), SyncError> {
        let (acting, text) = self.authored(message).await?;
        let post_id = self.destination.create_post(topic_id, &text, &acting).await?;
        self.persist(MappingKind::MessagePost, &message.id, &post_id, Some(&thread.id))
            .await?;
        Ok(())
    }

    async fn create_chat_message(
        &self,
        channel_id: &str,
        space: &Space,
        message: &Message,
    ) -> Result<(), SyncError> {
        let (acting, text) = self.authored(message).await?;
        let chat_message_id = self
            .destination
            .create_chat_message(channel_id, &text, &acting)
            .await?;
        self.persist(
            MappingKind::MessageChatMessage,
            &message.id,
            &chat_message_id,
            Some(&space.id),
        )
        .await?;
        Ok(())
    }

    /// Acting identity and rendered text for a message. Automated senders
    /// post as the service identity with their name prefixed.
    async fn authored(&self, message: &Message) -> Result<(ActingIdentity, String), SyncError> {
        if message.sender.is_bot {
            return Ok((
                ActingIdentity::Service,
                attributed(&message.sender.display_name, &message.text),
            ));
        }
        let handle = self.identities.resolve(&message.sender).await?;
        Ok((ActingIdentity::User(handle), message.text.clone()))
    }

    /// Records a mapping, adopting the winner's destination ID on a lost race.
    pub(crate) async fn persist(
        &self,
        kind: MappingKind,
        origin_id: &str,
        destination_id: &str,
        origin_parent_id: Option<&str>,
    ) -> Result<String, SyncError> {
        match self
            .store
            .insert_mapping(kind, origin_id, destination_id, origin_parent_id)
            .await
        {
            Ok(()) => Ok(destination_id.to_string()),
            Err(SyncError::MappingConflict { existing, .. }) => {
                warn!(
                    kind = %kind,
                    origin_id,
                    ours = destination_id,
                    existing = %existing,
                    "mapping already recorded, adopting existing destination"
                );
                Ok(existing)
            }
            Err(e) => Err(e),
        }
    }
}

/// Like [`escalate`], but keeps `NotFound` intact so the caller can retire
/// the space.
fn listing_error(e: SyncError, space_id: &str) -> SyncError {
    match e {
        SyncError::NotFound { .. } => e,
        other => escalate(other, space_id),
    }
}

/// Raises an error to space scope unless it already aborts the pass.
fn escalate(e: SyncError, space_id: &str) -> SyncError {
    match e.scope() {
        FailureScope::Pass => e,
        _ => e.into_space_failure(space_id),
    }
}
