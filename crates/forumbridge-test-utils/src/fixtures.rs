// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for origin entities, injectable failures, and temp stores.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use forumbridge_config::model::StorageConfig;
use forumbridge_core::{Message, Participant, SyncError};
use forumbridge_storage::SqliteMappingStore;

/// Base instant for [`ts`]; an arbitrary fixed point in 2026.
const EPOCH_SECS: i64 = 1_780_000_000;

/// A deterministic timestamp `secs` seconds after a fixed base instant.
pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(EPOCH_SECS + secs, 0)
        .single()
        .unwrap_or_default()
}

pub fn human(id: &str, display_name: &str) -> Participant {
    Participant {
        id: id.to_string(),
        display_name: display_name.to_string(),
        email: None,
        is_bot: false,
    }
}

pub fn bot(id: &str, display_name: &str) -> Participant {
    Participant {
        is_bot: true,
        ..human(id, display_name)
    }
}

/// A message created `secs` seconds after the base instant.
pub fn message_at(
    id: &str,
    space_id: &str,
    thread_id: Option<&str>,
    sender: &Participant,
    text: &str,
    secs: i64,
) -> Message {
    Message {
        id: id.to_string(),
        space_id: space_id.to_string(),
        thread_id: thread_id.map(str::to_string),
        sender: sender.clone(),
        text: text.to_string(),
        created_at: ts(secs),
    }
}

/// Kinds of remote failure a mock can be told to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Transient,
    RateLimited,
    Unauthorized,
    NotFound,
    Conflict,
    Permanent,
}

impl Failure {
    pub fn to_error(self, context: &str) -> SyncError {
        let message = format!("injected failure: {context}");
        match self {
            Failure::Transient => SyncError::TransientRemote {
                message,
                source: None,
            },
            Failure::RateLimited => SyncError::RateLimited { retry_after: None },
            Failure::Unauthorized => SyncError::Unauthorized { message },
            Failure::NotFound => SyncError::NotFound { resource: message },
            Failure::Conflict => SyncError::Conflict { message },
            Failure::Permanent => SyncError::PermanentRemote { message },
        }
    }
}

/// Opens an initialized mapping store in a fresh temp directory.
///
/// The directory is deleted when the returned guard drops.
///
/// # Panics
///
/// Panics if the temp directory or database cannot be created.
pub async fn temp_store() -> (Arc<SqliteMappingStore>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = StorageConfig {
        database_path: dir.path().join("forumbridge.db").to_string_lossy().into_owned(),
        wal_mode: true,
    };
    let store = SqliteMappingStore::open(config)
        .await
        .expect("open temp mapping store");
    (Arc::new(store), dir)
}
