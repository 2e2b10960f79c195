// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Destination -> origin propagation of newly created content.

use async_trait::async_trait;
use forumbridge_core::{
    ContentEvent, ContentEventHandler, EventOutcome, IgnoreReason, MappingKind, SyncError,
};
use tracing::{debug, error, info};

use crate::coordinator::SyncEngine;

/// Origin text for content relayed from the destination. The origin message
/// is authored by the service account, so the destination author is named.
pub fn relayed_text(author: &str, text: &str) -> String {
    format!("*{author}*: {text}")
}

impl SyncEngine {
    /// Propagates a content-created notification to the origin.
    ///
    /// Never fails: errors are logged and reported as an ignore with a
    /// `rejected` reason.
    pub async fn on_content_created(&self, event: &ContentEvent) -> EventOutcome {
        match self.propagate(event).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    entity_id = event.entity_id(),
                    container_id = event.container_id(),
                    error = %e,
                    "failed to propagate destination content"
                );
                EventOutcome::ignored(IgnoreReason::Rejected(e.to_string()))
            }
        }
    }

    async fn propagate(&self, event: &ContentEvent) -> Result<EventOutcome, SyncError> {
        if event
            .author()
            .eq_ignore_ascii_case(&self.settings.service_username)
        {
            debug!(entity_id = event.entity_id(), "ignoring content authored by service identity");
            return Ok(EventOutcome::ignored(IgnoreReason::SelfOrigin));
        }
        if self.is_synced(event).await? {
            return Ok(EventOutcome::ignored(IgnoreReason::AlreadySynced));
        }

        let Some(container) = self
            .store
            .get_by_destination(event.container_kind(), event.container_id())
            .await?
        else {
            debug!(container_id = event.container_id(), "container not mapped to origin");
            return Ok(EventOutcome::ignored(IgnoreReason::UnmappedContainer));
        };
        let (space_id, thread_id) = match event {
            ContentEvent::PostCreated { .. } => match container.origin_parent_id {
                Some(space_id) => (space_id, Some(container.origin_id)),
                None => return Ok(EventOutcome::ignored(IgnoreReason::UnmappedContainer)),
            },
            ContentEvent::ChatMessageCreated { .. } => (container.origin_id, None),
        };

        if event.text().trim().is_empty() {
            return Ok(EventOutcome::ignored(IgnoreReason::EmptyContent));
        }

        let _guard = self.space_locks.lock(&space_id).await;
        // A catch-up pass may have recorded it while we waited.
        if self.is_synced(event).await? {
            return Ok(EventOutcome::ignored(IgnoreReason::AlreadySynced));
        }

        let text = relayed_text(event.author(), event.text());
        let origin_message_id = self
            .origin
            .create_message(&space_id, thread_id.as_deref(), &text)
            .await?;
        let parent = thread_id.as_deref().unwrap_or(&space_id);
        self.persist(
            event.content_kind(),
            &origin_message_id,
            event.entity_id(),
            Some(parent),
        )
        .await?;

        info!(
            entity_id = event.entity_id(),
            origin_message_id = %origin_message_id,
            space_id = %space_id,
            "propagated destination content to origin"
        );
        Ok(EventOutcome::Accepted { origin_message_id })
    }

    /// True if the event's entity is the destination side of a message mapping.
    /// Posts and chat messages have separate ID sequences, so only the
    /// relation matching the event is consulted.
    async fn is_synced(&self, event: &ContentEvent) -> Result<bool, SyncError> {
        let kind = match event {
            ContentEvent::PostCreated { .. } => MappingKind::MessagePost,
            ContentEvent::ChatMessageCreated { .. } => MappingKind::MessageChatMessage,
        };
        Ok(self
            .store
            .get_by_destination(kind, event.entity_id())
            .await?
            .is_some())
    }
}

#[async_trait]
impl ContentEventHandler for SyncEngine {
    async fn on_content_created(&self, event: &ContentEvent) -> EventOutcome {
        SyncEngine::on_content_created(self, event).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use forumbridge_core::MappingStore;
    use forumbridge_storage::SqliteMappingStore;
    use forumbridge_test_utils::{MockDestination, MockSource, temp_store};
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::coordinator::EngineSettings;

    async fn engine() -> (SyncEngine, Arc<MockSource>, Arc<SqliteMappingStore>, tempfile::TempDir)
    {
        let source = Arc::new(
            MockSource::new()
                .with_space("spaces/G", "Eng", "SPACE")
                .with_space("spaces/D", "", "DIRECT_MESSAGE"),
        );
        let (store, dir) = temp_store().await;
        store
            .insert_mapping(MappingKind::ThreadTopic, "spaces/G/threads/T", "77", Some("spaces/G"))
            .await
            .unwrap();
        store
            .insert_mapping(MappingKind::SpaceChannel, "spaces/D", "5", None)
            .await
            .unwrap();
        store
            .insert_mapping(
                MappingKind::MessagePost,
                "spaces/G/messages/1",
                "900",
                Some("spaces/G/threads/T"),
            )
            .await
            .unwrap();
        let engine = SyncEngine::new(
            source.clone(),
            source.clone(),
            Arc::new(MockDestination::new()),
            store.clone(),
            EngineSettings::default(),
        );
        (engine, source, store, dir)
    }

    fn post(post_id: &str, topic_id: &str, username: &str) -> ContentEvent {
        ContentEvent::PostCreated {
            post_id: post_id.into(),
            topic_id: topic_id.into(),
            username: username.into(),
            raw: "from the forum".into(),
        }
    }

    #[tokio::test]
    async fn service_authored_content_is_ignored() {
        let (engine, source, _store, _dir) = engine().await;
        let outcome = engine.on_content_created(&post("901", "77", "System")).await;
        assert_eq!(outcome, EventOutcome::ignored(IgnoreReason::SelfOrigin));
        assert!(source.created_messages().await.is_empty());
    }

    #[tokio::test]
    async fn synced_content_is_ignored() {
        let (engine, _source, _store, _dir) = engine().await;
        let outcome = engine.on_content_created(&post("900", "77", "ann")).await;
        assert_eq!(outcome, EventOutcome::ignored(IgnoreReason::AlreadySynced));
    }

    #[tokio::test]
    async fn unmapped_topic_is_ignored() {
        let (engine, _source, _store, _dir) = engine().await;
        let outcome = engine.on_content_created(&post("901", "12345", "ann")).await;
        assert_eq!(outcome, EventOutcome::ignored(IgnoreReason::UnmappedContainer));
    }

    #[tokio::test]
    async fn post_is_relayed_into_thread_and_mapped() {
        let (engine, source, store, _dir) = engine().await;
        let outcome = engine.on_content_created(&post("901", "77", "ann")).await;

        let EventOutcome::Accepted { origin_message_id } = outcome else {
            panic!("expected accepted, got {outcome:?}");
        };
        let created = source.created_messages().await;
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].thread_id.as_deref(), Some("spaces/G/threads/T"));
        assert_eq!(created[0].text, "*ann*: from the forum");

        let record = store
            .get_by_destination(MappingKind::MessagePost, "901")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.origin_id, origin_message_id);

        // Redelivery of the same webhook is a no-op.
        let again = engine.on_content_created(&post("901", "77", "ann")).await;
        assert_eq!(again, EventOutcome::ignored(IgnoreReason::AlreadySynced));
    }

    #[tokio::test]
    async fn chat_message_is_relayed_into_space() {
        let (engine, source, _store, _dir) = engine().await;
        let event = ContentEvent::ChatMessageCreated {
            message_id: "31".into(),
            channel_id: "5".into(),
            username: "bo".into(),
            message: "hello".into(),
        };
        let outcome = engine.on_content_created(&event).await;
        assert!(outcome.is_accepted(), "unexpected outcome: {outcome:?}");
        let created = source.created_messages().await;
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].space_id, "spaces/D");
        assert_eq!(created[0].thread_id, None);
    }

    #[tokio::test]
    async fn relayed_content_is_not_synced_back() {
        let (engine, source, _store, _dir) = engine().await;
        engine.on_content_created(&post("901", "77", "ann")).await;

        let report = engine
            .sync_space("spaces/G", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.created, 0);
        assert_eq!(source.created_messages().await.len(), 1);
    }

    #[tokio::test]
    async fn origin_failure_is_reported_as_rejected() {
        let (engine, source, _store, _dir) = engine().await;
        source
            .fail_writes(forumbridge_test_utils::Failure::Permanent)
            .await;
        let outcome = engine.on_content_created(&post("902", "77", "ann")).await;
        assert!(matches!(
            outcome,
            EventOutcome::Ignored {
                reason: IgnoreReason::Rejected(_)
            }
        ));
    }
}
