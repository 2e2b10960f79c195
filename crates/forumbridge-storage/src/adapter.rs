// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the MappingStore trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use forumbridge_config::model::StorageConfig;
use forumbridge_core::{
    AdapterType, HealthStatus, MappingKind, MappingRecord, MappingStore, PluginAdapter, SyncError,
    UserRecord,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed mapping store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`MappingStore::initialize`].
pub struct SqliteMappingStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteMappingStore {
    /// Create a new store with the given configuration.
    ///
    /// The database connection is not opened until [`MappingStore::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Create and initialize a store in one step.
    pub async fn open(config: StorageConfig) -> Result<Self, SyncError> {
        let store = Self::new(config);
        store.initialize().await?;
        Ok(store)
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, SyncError> {
        self.db.get().ok_or_else(|| SyncError::Storage {
            source: "mapping store not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteMappingStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, SyncError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SyncError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl MappingStore for SqliteMappingStore {
    async fn initialize(&self) -> Result<(), SyncError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| SyncError::Storage {
            source: "mapping store already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "mapping store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), SyncError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Mapping operations ---

    async fn get_destination(
        &self,
        kind: MappingKind,
        origin_id: &str,
    ) -> Result<Option<String>, SyncError> {
        queries::mappings::get_destination(self.db()?, kind, origin_id).await
    }

    async fn get_by_destination(
        &self,
        kind: MappingKind,
        destination_id: &str,
    ) -> Result<Option<MappingRecord>, SyncError> {
        queries::mappings::get_by_destination(self.db()?, kind, destination_id).await
    }

    async fn insert_mapping(
        &self,
        kind: MappingKind,
        origin_id: &str,
        destination_id: &str,
        origin_parent_id: Option<&str>,
    ) -> Result<(), SyncError> {
        queries::mappings::insert_mapping(
            self.db()?,
            kind,
            origin_id,
            destination_id,
            origin_parent_id,
        )
        .await
    }

    async fn insert_topic(
        &self,
        thread: (&str, &str),
        opening: (&str, &str),
        space_id: &str,
    ) -> Result<(), SyncError> {
        queries::mappings::insert_topic(self.db()?, thread, opening, space_id).await
    }

    async fn record_user(&self, user: &UserRecord) -> Result<(), SyncError> {
        queries::mappings::record_user(self.db()?, user).await
    }

    async fn get_user(&self, origin_id: &str) -> Result<Option<UserRecord>, SyncError> {
        queries::mappings::get_user(self.db()?, origin_id).await
    }

    async fn list_mappings(
        &self,
        kind: Option<MappingKind>,
    ) -> Result<Vec<MappingRecord>, SyncError> {
        queries::mappings::list_mappings(self.db()?, kind).await
    }

    // --- Cursor operations ---

    async fn get_cursor(&self, space_id: &str) -> Result<Option<DateTime<Utc>>, SyncError> {
        queries::cursors::get_cursor(self.db()?, space_id).await
    }

    async fn advance_cursor(&self, space_id: &str, to: DateTime<Utc>) -> Result<(), SyncError> {
        queries::cursors::advance_cursor(self.db()?, space_id, to).await
    }

    async fn mark_space_inactive(&self, space_id: &str, reason: &str) -> Result<(), SyncError> {
        queries::cursors::mark_space_inactive(self.db()?, space_id, reason).await
    }

    async fn is_space_inactive(&self, space_id: &str) -> Result<bool, SyncError> {
        queries::cursors::is_space_inactive(self.db()?, space_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &tempfile::TempDir) -> StorageConfig {
        StorageConfig {
            database_path: dir.path().join("store.db").display().to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn uninitialized_store_reports_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteMappingStore::new(config_in(&dir));
        let err = store
            .get_destination(MappingKind::User, "users/1")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Storage { .. }));
    }

    #[tokio::test]
    async fn double_initialize_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteMappingStore::open(config_in(&dir)).await.unwrap();
        assert!(store.initialize().await.is_err());
    }

    #[tokio::test]
    async fn mappings_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SqliteMappingStore::open(config_in(&dir)).await.unwrap();
            store
                .insert_mapping(MappingKind::MessagePost, "m1", "501", Some("spaces/A/threads/T"))
                .await
                .unwrap();
            store.close().await.unwrap();
        }
        let store = SqliteMappingStore::open(config_in(&dir)).await.unwrap();
        assert_eq!(
            store
                .get_destination(MappingKind::MessagePost, "m1")
                .await
                .unwrap()
                .as_deref(),
            Some("501")
        );
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
    }
}
