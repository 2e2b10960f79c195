// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `forumbridge status` command implementation.
//!
//! Combines what a running `serve` process reports on the gateway's health
//! endpoint with the sync progress recorded in the mapping store: the cursor
//! of every bound space, spaces retired as gone from the origin, and mapping
//! totals per relation. The store half works while the service is down.

use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

use forumbridge_config::ForumbridgeConfig;
use forumbridge_config::model::GatewayConfig;
use forumbridge_core::{MappingStore, SyncError};
use forumbridge_storage::SqliteMappingStore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct Health {
    version: String,
    uptime_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct SpaceStatus {
    pub space_id: String,
    /// RFC 3339 cursor; `None` before the first completed sync.
    pub synced_through: Option<String>,
    pub inactive: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub endpoint: String,
    pub running: bool,
    pub version: Option<String>,
    pub uptime_secs: Option<u64>,
    /// False when the database file does not exist yet.
    pub store_present: bool,
    pub spaces: Vec<SpaceStatus>,
    pub mappings: BTreeMap<String, usize>,
}

/// Health URL of the gateway; a wildcard bind is reached through loopback.
fn health_url(gateway: &GatewayConfig) -> String {
    let host = match gateway.host.as_str() {
        "0.0.0.0" => "127.0.0.1",
        "::" | "[::]" => "[::1]",
        other => other,
    };
    format!("http://{host}:{}/health", gateway.port)
}

async fn fetch_health(url: &str) -> Result<Option<Health>, SyncError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(3))
        .build()
        .map_err(|e| SyncError::Internal(format!("failed to create HTTP client: {e}")))?;
    match client.get(url).send().await {
        Ok(resp) if resp.status().is_success() => resp
            .json::<Health>()
            .await
            .map(Some)
            .map_err(|e| SyncError::Internal(format!("unexpected health response: {e}"))),
        _ => Ok(None),
    }
}

/// Reads per-space cursors and mapping totals. A missing database is
/// reported as absent rather than created.
async fn sync_progress(
    config: &ForumbridgeConfig,
    report: &mut StatusReport,
) -> Result<(), SyncError> {
    if !Path::new(&config.storage.database_path).exists() {
        return Ok(());
    }
    let store = SqliteMappingStore::open(config.storage.clone()).await?;
    report.store_present = true;

    for binding in &config.mappings {
        let cursor = store.get_cursor(&binding.space_id).await?;
        report.spaces.push(SpaceStatus {
            space_id: binding.space_id.clone(),
            synced_through: cursor.map(|c| c.to_rfc3339()),
            inactive: store.is_space_inactive(&binding.space_id).await?,
        });
    }
    for record in store.list_mappings(None).await? {
        *report.mappings.entry(record.kind.to_string()).or_default() += 1;
    }
    store.close().await
}

fn humanize_uptime(secs: u64) -> String {
    let (days, hours, minutes) = (secs / 86_400, secs / 3_600 % 24, secs / 60 % 60);
    match (days, hours) {
        (0, 0) => format!("{minutes}m"),
        (0, _) => format!("{hours}h {minutes}m"),
        _ => format!("{days}d {hours}h {minutes}m"),
    }
}

fn render(report: &StatusReport, use_color: bool) -> String {
    use colored::Colorize;

    let paint = |text: &str, ok: bool| -> String {
        match (use_color, ok) {
            (false, _) => text.to_string(),
            (true, true) => text.green().to_string(),
            (true, false) => text.red().to_string(),
        }
    };

    let mut out = String::from("\n  forumbridge status\n");
    out.push_str(&format!("  {}\n", "-".repeat(35)));
    match (&report.version, report.uptime_secs) {
        (Some(version), Some(uptime)) => out.push_str(&format!(
            "    Service:  {} v{version}, up {}\n",
            paint("running", true),
            humanize_uptime(uptime)
        )),
        _ => out.push_str(&format!(
            "    Service:  {} ({})\n",
            paint("not running", false),
            report.endpoint
        )),
    }

    if !report.store_present {
        out.push_str("    Store:    no database yet; run `forumbridge sync` first\n\n");
        return out;
    }
    for space in &report.spaces {
        let state = match (&space.synced_through, space.inactive) {
            (_, true) => paint("inactive (gone from origin)", false),
            (Some(cursor), false) => format!("synced through {cursor}"),
            (None, false) => "never synced".to_string(),
        };
        out.push_str(&format!("    {:<24} {state}\n", space.space_id));
    }
    let totals: Vec<String> = report
        .mappings
        .iter()
        .map(|(kind, n)| format!("{kind}={n}"))
        .collect();
    let totals = if totals.is_empty() {
        "none".to_string()
    } else {
        totals.join(" ")
    };
    out.push_str(&format!("    Mappings: {totals}\n\n"));
    out
}

/// Runs the `forumbridge status` command.
pub async fn run_status(
    config: &ForumbridgeConfig,
    json: bool,
    plain: bool,
) -> Result<(), SyncError> {
    let endpoint = health_url(&config.gateway);
    let health = fetch_health(&endpoint).await?;
    let mut report = StatusReport {
        running: health.is_some(),
        version: health.as_ref().map(|h| h.version.clone()),
        uptime_secs: health.as_ref().map(|h| h.uptime_secs),
        endpoint,
        store_present: false,
        spaces: Vec::new(),
        mappings: BTreeMap::new(),
    };
    sync_progress(config, &mut report).await?;

    if json {
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| SyncError::Internal(format!("failed to serialize status: {e}")))?;
        println!("{out}");
    } else {
        print!("{}", render(&report, !plain && std::io::stdout().is_terminal()));
    }
    Ok(())
}
