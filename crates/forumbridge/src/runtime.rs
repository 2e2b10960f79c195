// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter wiring shared by `serve` and `sync`.

use std::sync::Arc;

use forumbridge_config::ForumbridgeConfig;
use forumbridge_core::{MappingStore, SyncError};
use forumbridge_discourse::DiscourseDestination;
use forumbridge_engine::{EngineSettings, SyncEngine};
use forumbridge_gchat::GoogleChatSource;
use forumbridge_resilience::RetryPolicy;
use forumbridge_storage::SqliteMappingStore;
use tracing::info;

/// A fully assembled engine and the store it writes to.
pub struct Runtime {
    pub engine: Arc<SyncEngine>,
    pub store: Arc<SqliteMappingStore>,
}

impl Runtime {
    /// Opens the mapping store and builds both platform adapters.
    ///
    /// A store that cannot be opened is fatal; nothing is synced without it.
    pub async fn assemble(config: &ForumbridgeConfig) -> Result<Self, SyncError> {
        let store = Arc::new(SqliteMappingStore::open(config.storage.clone()).await?);
        info!(path = %config.storage.database_path, "mapping store opened");

        let retry = RetryPolicy::from_config(&config.retry);
        let source = Arc::new(GoogleChatSource::new(&config.google, retry.clone())?);
        let destination = Arc::new(DiscourseDestination::new(&config.discourse, retry)?);

        let engine = SyncEngine::new(
            source.clone(),
            source,
            destination,
            store.clone(),
            EngineSettings::from_config(config),
        );
        Ok(Self {
            engine: Arc::new(engine),
            store,
        })
    }

    /// Flushes the store. Call once all work has stopped.
    pub async fn close(&self) -> Result<(), SyncError> {
        self.store.close().await
    }
}

/// Initializes the tracing subscriber with the given log level.
///
/// `RUST_LOG` overrides the configured level when set.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("forumbridge={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
