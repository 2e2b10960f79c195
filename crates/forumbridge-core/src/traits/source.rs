// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Origin platform traits: reading rooms and messages, and writing replies back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SyncError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Container, Message, Participant, Space, Thread};

/// Read access to the origin platform.
///
/// `since` is exclusive: only entities created strictly after it are returned.
/// Implementations report `RateLimited` for throttling and `NotFound` for
/// spaces that no longer exist.
#[async_trait]
pub trait SourceReader: PluginAdapter {
    /// Lists every space visible to the service account.
    async fn list_spaces(&self) -> Result<Vec<Space>, SyncError>;

    /// Fetches a single space.
    async fn get_space(&self, space_id: &str) -> Result<Space, SyncError>;

    /// Lists threads in a space with activity after `since`.
    async fn list_threads(
        &self,
        space_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Thread>, SyncError>;

    /// Lists messages in a space or thread created after `since`.
    async fn list_messages(
        &self,
        container: &Container,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Message>, SyncError>;

    /// Lists the members of a space.
    async fn list_members(&self, space_id: &str) -> Result<Vec<Participant>, SyncError>;
}

/// Write access to the origin platform, used by the destination -> origin path.
#[async_trait]
pub trait OriginWriter: Send + Sync {
    /// Posts `text` into a space, replying in `thread_id` when given.
    /// Returns the new message's origin ID.
    async fn create_message(
        &self,
        space_id: &str,
        thread_id: Option<&str>,
        text: &str,
    ) -> Result<String, SyncError>;
}
