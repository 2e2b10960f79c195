// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Destination platform trait.

use async_trait::async_trait;

use crate::error::SyncError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ActingIdentity, CategoryRequest, CreatedTopic, DestinationUser, NewUser};

/// Write access to the destination forum and its DM chat.
///
/// Every content call takes an explicit acting identity. Implementations map
/// a taken resource to `Conflict`, rejected credentials to `Unauthorized`,
/// and throttling to `RateLimited`. All returned IDs are opaque strings.
#[async_trait]
pub trait DestinationWriter: PluginAdapter {
    /// Returns the category bound to a space, creating it if necessary.
    async fn find_or_create_category(
        &self,
        request: &CategoryRequest,
        acting: &ActingIdentity,
    ) -> Result<String, SyncError>;

    async fn create_topic(
        &self,
        category_id: &str,
        title: &str,
        body: &str,
        acting: &ActingIdentity,
    ) -> Result<CreatedTopic, SyncError>;

    /// Returns the new post's ID.
    async fn create_post(
        &self,
        topic_id: &str,
        body: &str,
        acting: &ActingIdentity,
    ) -> Result<String, SyncError>;

    /// Looks up a user by exact username.
    async fn lookup_user(&self, username: &str) -> Result<Option<DestinationUser>, SyncError>;

    /// Creates a user. A taken username or email is reported as `Conflict`.
    async fn create_user(&self, user: &NewUser) -> Result<DestinationUser, SyncError>;

    async fn user_exists(&self, username: &str) -> Result<bool, SyncError> {
        Ok(self.lookup_user(username).await?.is_some())
    }

    /// Returns the existing user with this username, or creates it.
    async fn find_or_create_user(&self, user: &NewUser) -> Result<DestinationUser, SyncError> {
        if let Some(existing) = self.lookup_user(&user.username).await? {
            return Ok(existing);
        }
        self.create_user(user).await
    }

    /// Creates (or reopens) a direct-message channel between the given users.
    async fn create_dm_channel(
        &self,
        usernames: &[String],
        acting: &ActingIdentity,
    ) -> Result<String, SyncError>;

    /// Returns the new chat message's ID.
    async fn create_chat_message(
        &self,
        channel_id: &str,
        text: &str,
        acting: &ActingIdentity,
    ) -> Result<String, SyncError>;
}
