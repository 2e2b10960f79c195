// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Chat origin adapter for forumbridge.
//!
//! Implements [`SourceReader`] and [`OriginWriter`] over the Google Chat REST
//! API. Spaces, threads, messages and users keep their full resource names
//! (`spaces/AAA`, `spaces/AAA/threads/BBB`, `users/123`) as origin IDs.

pub mod client;
pub mod types;

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use forumbridge_config::model::GoogleConfig;
use forumbridge_core::{
    AdapterType, Container, HealthStatus, Message, OriginWriter, Participant, PluginAdapter,
    SourceReader, Space, SyncError, Thread,
};
use forumbridge_resilience::RetryPolicy;
use tracing::{debug, info};

use crate::client::{GoogleChatClient, message_filter};
use crate::types::{ApiMessage, ApiSpace, ApiUser, TokenFile};

/// Sender ID used for messages the API returns without a sender.
const UNKNOWN_SENDER_ID: &str = "users/unknown";

/// Google Chat implementation of [`SourceReader`] and [`OriginWriter`].
pub struct GoogleChatSource {
    client: GoogleChatClient,
}

impl GoogleChatSource {
    /// Creates the adapter from configuration, resolving the bearer token from
    /// `google.access_token` or `google.token_file`.
    pub fn new(config: &GoogleConfig, retry: RetryPolicy) -> Result<Self, SyncError> {
        let token = resolve_token(config)?;
        let client = GoogleChatClient::new(
            &config.api_base_url,
            &token,
            config.page_size,
            Duration::from_secs(config.request_timeout_secs),
            retry,
        )?;
        info!(base_url = %config.api_base_url, "Google Chat adapter initialized");
        Ok(Self { client })
    }

    /// Creates an adapter around an existing client (for testing).
    pub fn with_client(client: GoogleChatClient) -> Self {
        Self { client }
    }
}

/// Reads the bearer token from config, falling back to the token file.
pub fn resolve_token(config: &GoogleConfig) -> Result<String, SyncError> {
    if let Some(token) = config.access_token.as_deref().filter(|t| !t.trim().is_empty()) {
        return Ok(token.trim().to_string());
    }
    match config.token_file.as_deref() {
        Some(path) => read_token_file(Path::new(path)),
        None => Err(SyncError::Config(
            "neither google.access_token nor google.token_file is set".into(),
        )),
    }
}

fn read_token_file(path: &Path) -> Result<String, SyncError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        SyncError::Config(format!("failed to read token file {}: {e}", path.display()))
    })?;
    let parsed: TokenFile = serde_json::from_str(&raw).map_err(|e| {
        SyncError::Config(format!("invalid token file {}: {e}", path.display()))
    })?;
    if parsed.token.trim().is_empty() {
        return Err(SyncError::Config(format!(
            "token file {} has an empty token",
            path.display()
        )));
    }
    Ok(parsed.token.trim().to_string())
}

fn to_space(api: ApiSpace) -> Space {
    let space_type = api.reported_type();
    Space {
        display_name: api.display_name.clone().unwrap_or_default(),
        id: api.name,
        space_type,
    }
}

fn to_participant(user: ApiUser) -> Participant {
    let is_bot = user.is_bot();
    Participant {
        display_name: user.display_name.clone().unwrap_or_else(|| user.name.clone()),
        id: user.name,
        email: None,
        is_bot,
    }
}

fn to_message(space_id: &str, api: ApiMessage) -> Message {
    let sender = api.sender.map(to_participant).unwrap_or_else(|| Participant {
        id: UNKNOWN_SENDER_ID.to_string(),
        display_name: "Unknown".to_string(),
        email: None,
        is_bot: true,
    });
    Message {
        id: api.name,
        space_id: space_id.to_string(),
        thread_id: api.thread.map(|t| t.name),
        sender,
        text: api.text.unwrap_or_default(),
        created_at: api.create_time,
    }
}

#[async_trait]
impl PluginAdapter for GoogleChatSource {
    fn name(&self) -> &str {
        "google-chat"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Source
    }

    async fn health_check(&self) -> Result<HealthStatus, SyncError> {
        match self.client.list_spaces().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), SyncError> {
        Ok(())
    }
}

#[async_trait]
impl SourceReader for GoogleChatSource {
    async fn list_spaces(&self) -> Result<Vec<Space>, SyncError> {
        Ok(self
            .client
            .list_spaces()
            .await?
            .into_iter()
            .map(to_space)
            .collect())
    }

    async fn get_space(&self, space_id: &str) -> Result<Space, SyncError> {
        self.client.get_space(space_id).await.map(to_space)
    }

    async fn list_threads(
        &self,
        space_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Thread>, SyncError> {
        // Chat has no thread listing; threads are recovered from recent messages.
        let messages = self
            .client
            .list_messages(space_id, message_filter(since, None))
            .await?;
        let mut seen = HashSet::new();
        let threads: Vec<Thread> = messages
            .into_iter()
            .filter_map(|m| m.thread.map(|t| t.name))
            .filter(|name| seen.insert(name.clone()))
            .map(|id| Thread {
                id,
                space_id: space_id.to_string(),
            })
            .collect();
        debug!(space_id, count = threads.len(), "listed active threads");
        Ok(threads)
    }

    async fn list_messages(
        &self,
        container: &Container,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Message>, SyncError> {
        let (space_id, thread) = match container {
            Container::Space(space_id) => (space_id.as_str(), None),
            Container::Thread {
                space_id,
                thread_id,
            } => (space_id.as_str(), Some(thread_id.as_str())),
        };
        let messages = self
            .client
            .list_messages(space_id, message_filter(since, thread))
            .await?;
        Ok(messages
            .into_iter()
            .map(|m| to_message(space_id, m))
            .collect())
    }

    async fn list_members(&self, space_id: &str) -> Result<Vec<Participant>, SyncError> {
        Ok(self
            .client
            .list_memberships(space_id)
            .await?
            .into_iter()
            .filter(|m| m.state.as_deref().is_none_or(|s| s == "JOINED"))
            .filter_map(|m| m.member)
            .map(to_participant)
            .collect())
    }
}

#[async_trait]
impl OriginWriter for GoogleChatSource {
    async fn create_message(
        &self,
        space_id: &str,
        thread_id: Option<&str>,
        text: &str,
    ) -> Result<String, SyncError> {
        let created = self.client.create_message(space_id, text, thread_id).await?;
        debug!(space_id, message_id = %created.name, "created origin message");
        Ok(created.name)
    }
}
