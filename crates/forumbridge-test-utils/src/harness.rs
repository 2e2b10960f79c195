// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete [`SyncEngine`] over a [`MockSource`],
//! a [`MockDestination`] and a temp SQLite mapping store. `restart()` drops
//! the engine and reopens the store from disk, the way a process restart
//! would, so crash-recovery behavior can be exercised.

use std::sync::Arc;

use forumbridge_config::model::{ForumbridgeConfig, IdentityConfig, SpaceBinding, StorageConfig};
use forumbridge_core::{
    ContentEvent, EventOutcome, MappingKind, MappingRecord, MappingStore, SyncError,
};
use forumbridge_engine::{EngineSettings, PassReport, SyncEngine};
use forumbridge_storage::SqliteMappingStore;
use tokio_util::sync::CancellationToken;

use crate::mock_destination::MockDestination;
use crate::mock_source::MockSource;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    source: MockSource,
    destination: MockDestination,
    config: ForumbridgeConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            source: MockSource::new(),
            destination: MockDestination::new(),
            config: ForumbridgeConfig::default(),
        }
    }

    pub fn with_source(mut self, source: MockSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_destination(mut self, destination: MockDestination) -> Self {
        self.destination = destination;
        self
    }

    /// Binds a space so passes sync it.
    pub fn with_binding(mut self, space_id: &str) -> Self {
        self.config.mappings.push(SpaceBinding {
            space_id: space_id.to_string(),
            category_id: None,
            parent_category_id: None,
        });
        self
    }

    /// Syncs every space the source lists.
    pub fn sync_all_spaces(mut self) -> Self {
        self.config.service.sync_all_spaces = true;
        self
    }

    pub fn with_identity(mut self, identity: IdentityConfig) -> Self {
        self.config.identity = identity;
        self
    }

    pub fn with_max_parallel_spaces(mut self, n: usize) -> Self {
        self.config.service.max_parallel_spaces = n;
        self
    }

    /// Build the test harness, opening a temp mapping store.
    pub async fn build(self) -> Result<TestHarness, SyncError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| SyncError::Storage {
            source: Box::new(e),
        })?;
        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: temp_dir
                .path()
                .join("forumbridge.db")
                .to_string_lossy()
                .into_owned(),
            wal_mode: true,
        };

        let source = Arc::new(self.source);
        let destination = Arc::new(self.destination);
        let store = Arc::new(SqliteMappingStore::open(config.storage.clone()).await?);
        let engine = assemble(&source, &destination, &store, &config);

        Ok(TestHarness {
            source,
            destination,
            store,
            engine,
            config,
            _temp_dir: temp_dir,
        })
    }
}

fn assemble(
    source: &Arc<MockSource>,
    destination: &Arc<MockDestination>,
    store: &Arc<SqliteMappingStore>,
    config: &ForumbridgeConfig,
) -> SyncEngine {
    SyncEngine::new(
        source.clone(),
        source.clone(),
        destination.clone(),
        store.clone(),
        EngineSettings::from_config(config),
    )
}

/// A complete test environment with mock platforms and temp storage.
pub struct TestHarness {
    /// The mock origin platform.
    pub source: Arc<MockSource>,
    /// The mock destination forum.
    pub destination: Arc<MockDestination>,
    /// SQLite mapping store (temp DB, cleaned up on drop).
    pub store: Arc<SqliteMappingStore>,
    pub engine: SyncEngine,
    pub config: ForumbridgeConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Runs one catch-up pass to completion.
    pub async fn run_pass(&self) -> Result<PassReport, SyncError> {
        self.engine.run_pass(&CancellationToken::new()).await
    }

    pub async fn deliver(&self, event: &ContentEvent) -> EventOutcome {
        self.engine.on_content_created(event).await
    }

    /// Simulates a process restart: closes the store, reopens it from the
    /// same file, and builds a fresh engine with empty in-memory state.
    pub async fn restart(&mut self) -> Result<(), SyncError> {
        self.store.close().await?;
        self.store = Arc::new(SqliteMappingStore::open(self.config.storage.clone()).await?);
        self.engine = assemble(&self.source, &self.destination, &self.store, &self.config);
        Ok(())
    }

    pub async fn mappings(&self, kind: MappingKind) -> Result<Vec<MappingRecord>, SyncError> {
        self.store.list_mappings(Some(kind)).await
    }
}
