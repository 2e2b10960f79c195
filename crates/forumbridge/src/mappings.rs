// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `forumbridge mappings` command implementation.
//!
//! Lists persisted origin -> destination mappings, optionally filtered to one
//! relation. Reads the store directly and needs no platform credentials.

use forumbridge_config::ForumbridgeConfig;
use forumbridge_core::{MappingKind, MappingRecord, MappingStore, SyncError};
use forumbridge_storage::SqliteMappingStore;

/// Runs the `forumbridge mappings` command.
pub async fn run_mappings(
    config: &ForumbridgeConfig,
    kind: Option<MappingKind>,
    json: bool,
) -> Result<(), SyncError> {
    let store = SqliteMappingStore::open(config.storage.clone()).await?;
    let records = store.list_mappings(kind).await?;
    store.close().await?;

    if json {
        let out = serde_json::to_string_pretty(&records)
            .map_err(|e| SyncError::Internal(format!("failed to serialize mappings: {e}")))?;
        println!("{out}");
    } else {
        print!("{}", render_table(&records));
    }
    Ok(())
}

fn render_table(records: &[MappingRecord]) -> String {
    if records.is_empty() {
        return "  no mappings recorded\n".to_string();
    }
    let origin_width = records
        .iter()
        .map(|r| r.origin_id.len())
        .max()
        .unwrap_or(0)
        .max("ORIGIN".len());

    let mut out = format!(
        "  {:<22} {:<origin_width$} {:<12} PARENT\n",
        "KIND", "ORIGIN", "DESTINATION"
    );
    for record in records {
        out.push_str(&format!(
            "  {:<22} {:<origin_width$} {:<12} {}\n",
            record.kind.to_string(),
            record.origin_id,
            record.destination_id,
            record.origin_parent_id.as_deref().unwrap_or("-"),
        ));
    }
    out.push_str(&format!("\n  {} mapping(s)\n", records.len()));
    out
}
