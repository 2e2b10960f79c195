// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping store wrapper that can lose topic writes on demand.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use forumbridge_core::{
    AdapterType, HealthStatus, MappingKind, MappingRecord, MappingStore, PluginAdapter, SyncError,
    UserRecord,
};
use forumbridge_storage::SqliteMappingStore;

/// Delegates to a real SQLite store, except that queued topic writes fail
/// with a storage error before reaching it.
pub struct FlakyStore {
    inner: Arc<SqliteMappingStore>,
    failing_topic_writes: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<SqliteMappingStore>) -> Self {
        Self {
            inner,
            failing_topic_writes: AtomicUsize::new(0),
        }
    }

    /// Makes the next `insert_topic` call fail.
    pub fn fail_next_topic_write(&self) {
        self.failing_topic_writes.fetch_add(1, Ordering::SeqCst);
    }

    fn take_failure(&self) -> bool {
        self.failing_topic_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl PluginAdapter for FlakyStore {
    fn name(&self) -> &str {
        "flaky-sqlite"
    }

    fn version(&self) -> semver::Version {
        self.inner.version()
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, SyncError> {
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), SyncError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl MappingStore for FlakyStore {
    async fn initialize(&self) -> Result<(), SyncError> {
        self.inner.initialize().await
    }

    async fn close(&self) -> Result<(), SyncError> {
        self.inner.close().await
    }

    async fn get_destination(
        &self,
        kind: MappingKind,
        origin_id: &str,
    ) -> Result<Option<String>, SyncError> {
        self.inner.get_destination(kind, origin_id).await
    }

    async fn get_by_destination(
        &self,
        kind: MappingKind,
        destination_id: &str,
    ) -> Result<Option<MappingRecord>, SyncError> {
        self.inner.get_by_destination(kind, destination_id).await
    }

    async fn insert_mapping(
        &self,
        kind: MappingKind,
        origin_id: &str,
        destination_id: &str,
        origin_parent_id: Option<&str>,
    ) -> Result<(), SyncError> {
        self.inner
            .insert_mapping(kind, origin_id, destination_id, origin_parent_id)
            .await
    }

    async fn insert_topic(
        &self,
        thread: (&str, &str),
        opening: (&str, &str),
        space_id: &str,
    ) -> Result<(), SyncError> {
        if self.take_failure() {
            return Err(SyncError::Storage {
                source: format!("disk gone while recording {}", thread.0).into(),
            });
        }
        self.inner.insert_topic(thread, opening, space_id).await
    }

    async fn record_user(&self, user: &UserRecord) -> Result<(), SyncError> {
        self.inner.record_user(user).await
    }

    async fn get_user(&self, origin_id: &str) -> Result<Option<UserRecord>, SyncError> {
        self.inner.get_user(origin_id).await
    }

    async fn list_mappings(
        &self,
        kind: Option<MappingKind>,
    ) -> Result<Vec<MappingRecord>, SyncError> {
        self.inner.list_mappings(kind).await
    }

    async fn get_cursor(&self, space_id: &str) -> Result<Option<DateTime<Utc>>, SyncError> {
        self.inner.get_cursor(space_id).await
    }

    async fn advance_cursor(&self, space_id: &str, to: DateTime<Utc>) -> Result<(), SyncError> {
        self.inner.advance_cursor(space_id, to).await
    }

    async fn mark_space_inactive(&self, space_id: &str, reason: &str) -> Result<(), SyncError> {
        self.inner.mark_space_inactive(space_id, reason).await
    }

    async fn is_space_inactive(&self, space_id: &str) -> Result<bool, SyncError> {
        self.inner.is_space_inactive(space_id).await
    }
}
