// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping store trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SyncError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{MappingKind, MappingRecord, UserRecord};

/// Durable record of every origin <-> destination correspondence plus the
/// per-space sync cursors.
///
/// Inserts are atomic and unique per origin ID: a second insert for the same
/// origin ID fails with `MappingConflict` carrying the stored destination ID.
/// Every write is committed before the call returns.
#[async_trait]
pub trait MappingStore: PluginAdapter {
    /// Opens the store and applies pending migrations.
    async fn initialize(&self) -> Result<(), SyncError>;

    /// Flushes and closes the store.
    async fn close(&self) -> Result<(), SyncError>;

    async fn get_destination(
        &self,
        kind: MappingKind,
        origin_id: &str,
    ) -> Result<Option<String>, SyncError>;

    /// Reverse lookup. Destination IDs are not unique; the oldest row wins.
    async fn get_by_destination(
        &self,
        kind: MappingKind,
        destination_id: &str,
    ) -> Result<Option<MappingRecord>, SyncError>;

    async fn insert_mapping(
        &self,
        kind: MappingKind,
        origin_id: &str,
        destination_id: &str,
        origin_parent_id: Option<&str>,
    ) -> Result<(), SyncError>;

    /// Records a new thread -> topic mapping together with its opening
    /// message -> post mapping. Either both rows are stored or neither is.
    ///
    /// If the thread is already mapped the opening message is still recorded
    /// and `MappingConflict` carries the stored topic ID.
    async fn insert_topic(
        &self,
        thread: (&str, &str),
        opening: (&str, &str),
        space_id: &str,
    ) -> Result<(), SyncError>;

    /// Inserts a user mapping with its display details.
    async fn record_user(&self, user: &UserRecord) -> Result<(), SyncError>;

    async fn get_user(&self, origin_id: &str) -> Result<Option<UserRecord>, SyncError>;

    async fn list_mappings(
        &self,
        kind: Option<MappingKind>,
    ) -> Result<Vec<MappingRecord>, SyncError>;

    async fn get_cursor(&self, space_id: &str) -> Result<Option<DateTime<Utc>>, SyncError>;

    /// Moves the cursor forward. An older timestamp leaves it unchanged.
    async fn advance_cursor(&self, space_id: &str, to: DateTime<Utc>) -> Result<(), SyncError>;

    async fn mark_space_inactive(&self, space_id: &str, reason: &str) -> Result<(), SyncError>;

    async fn is_space_inactive(&self, space_id: &str) -> Result<bool, SyncError>;
}
