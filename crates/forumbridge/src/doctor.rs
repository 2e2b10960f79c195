// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `forumbridge doctor` command implementation.
//!
//! Runs diagnostic checks against the configuration, the mapping store and
//! both platforms' credentials, and reports each result.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use forumbridge_config::ForumbridgeConfig;
use forumbridge_core::{HealthStatus, MappingStore, PluginAdapter, SourceReader, SyncError};
use forumbridge_discourse::DiscourseDestination;
use forumbridge_gchat::GoogleChatSource;
use forumbridge_resilience::RetryPolicy;
use forumbridge_storage::SqliteMappingStore;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `forumbridge doctor` command.
///
/// Platform checks use a single attempt so a dead endpoint reports quickly.
pub async fn run_doctor(config: &ForumbridgeConfig, plain: bool) -> Result<(), SyncError> {
    let use_color = !plain && std::io::stdout().is_terminal();

    let mut results = vec![
        check_credentials(config),
        check_database(config).await,
        check_google(config).await,
        check_discourse(config).await,
    ];
    if !config.mappings.is_empty() {
        results.push(check_bindings(config).await);
    }

    println!();
    println!("  forumbridge doctor");
    println!("  {}", "-".repeat(50));

    let mut issues = 0;
    for result in &results {
        if result.status != CheckStatus::Pass {
            issues += 1;
        }
        println!("{}", format_line(result, use_color));
    }

    println!();
    if issues > 0 {
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    Ok(())
}

fn format_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green().to_string(), result.message.normal()),
            CheckStatus::Warn => ("!".yellow().to_string(), result.message.yellow()),
            CheckStatus::Fail => ("✗".red().to_string(), result.message.red()),
        };
        format!("    {symbol} {:<20} {message} ({duration_ms}ms)", result.name)
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!("    {tag} {:<20} {} ({duration_ms}ms)", result.name, result.message)
    }
}

/// Configuration was already parsed; check it is complete enough to sync.
fn check_credentials(config: &ForumbridgeConfig) -> CheckResult {
    let start = Instant::now();
    match forumbridge_config::validate_credentials(config) {
        Ok(()) => CheckResult::new("Configuration", CheckStatus::Pass, "valid", start),
        Err(errors) => {
            let first = errors.first().map(|e| e.to_string()).unwrap_or_default();
            CheckResult::new(
                "Configuration",
                CheckStatus::Fail,
                format!("{} error(s), first: {first}", errors.len()),
                start,
            )
        }
    }
}

/// Opens (and migrates) the mapping store, then reports its size.
async fn check_database(config: &ForumbridgeConfig) -> CheckResult {
    let start = Instant::now();
    let path = &config.storage.database_path;
    if !std::path::Path::new(path).exists() {
        return CheckResult::new(
            "Database",
            CheckStatus::Warn,
            format!("not found: {path} (will be created on first run)"),
            start,
        );
    }

    let store = match SqliteMappingStore::open(config.storage.clone()).await {
        Ok(store) => store,
        Err(e) => {
            let message = format!("open failed: {e}");
            return CheckResult::new("Database", CheckStatus::Fail, message, start);
        }
    };
    let result = match store.list_mappings(None).await {
        Ok(records) => CheckResult::new(
            "Database",
            CheckStatus::Pass,
            format!("{} mapping(s)", records.len()),
            start,
        ),
        Err(e) => {
            CheckResult::new("Database", CheckStatus::Fail, format!("query failed: {e}"), start)
        }
    };
    let _ = store.close().await;
    result
}

fn health_result(
    name: &str,
    health: Result<HealthStatus, SyncError>,
    start: Instant,
) -> CheckResult {
    match health {
        Ok(HealthStatus::Healthy) => {
            CheckResult::new(name, CheckStatus::Pass, "credentials accepted", start)
        }
        Ok(HealthStatus::Degraded(msg)) => CheckResult::new(name, CheckStatus::Warn, msg, start),
        Ok(HealthStatus::Unhealthy(msg)) => CheckResult::new(name, CheckStatus::Fail, msg, start),
        Err(e) => CheckResult::new(name, CheckStatus::Fail, e.to_string(), start),
    }
}

async fn check_google(config: &ForumbridgeConfig) -> CheckResult {
    let start = Instant::now();
    match GoogleChatSource::new(&config.google, RetryPolicy::no_retry()) {
        Ok(source) => health_result("Google Chat", source.health_check().await, start),
        Err(e) => CheckResult::new("Google Chat", CheckStatus::Fail, e.to_string(), start),
    }
}

async fn check_discourse(config: &ForumbridgeConfig) -> CheckResult {
    let start = Instant::now();
    match DiscourseDestination::new(&config.discourse, RetryPolicy::no_retry()) {
        Ok(destination) => health_result("Discourse", destination.health_check().await, start),
        Err(e) => CheckResult::new("Discourse", CheckStatus::Fail, e.to_string(), start),
    }
}

/// Every bound space must be visible to the configured credentials.
async fn check_bindings(config: &ForumbridgeConfig) -> CheckResult {
    let start = Instant::now();
    let source = match GoogleChatSource::new(&config.google, RetryPolicy::no_retry()) {
        Ok(source) => source,
        Err(e) => {
            return CheckResult::new("Space bindings", CheckStatus::Fail, e.to_string(), start);
        }
    };

    let mut missing = Vec::new();
    for binding in &config.mappings {
        if let Err(e) = source.get_space(&binding.space_id).await {
            missing.push(format!("{} ({e})", binding.space_id));
        }
    }
    if missing.is_empty() {
        CheckResult::new(
            "Space bindings",
            CheckStatus::Pass,
            format!("{} space(s) reachable", config.mappings.len()),
            start,
        )
    } else {
        CheckResult::new(
            "Space bindings",
            CheckStatus::Fail,
            format!("unreachable: {}", missing.join(", ")),
            start,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_lacks_credentials() {
        let result = check_credentials(&ForumbridgeConfig::default());
        assert_eq!(result.status, CheckStatus::Fail);
        assert_eq!(result.name, "Configuration");
    }

    #[tokio::test]
    async fn missing_database_warns() {
        let mut config = ForumbridgeConfig::default();
        config.storage.database_path = "/tmp/nonexistent-forumbridge-test-xyz.db".to_string();
        let result = check_database(&config).await;
        assert_eq!(result.status, CheckStatus::Warn);
        assert!(result.message.contains("not found"));
    }

    #[tokio::test]
    async fn existing_database_reports_mapping_count() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ForumbridgeConfig::default();
        config.storage.database_path = dir.path().join("fb.db").to_string_lossy().into_owned();
        SqliteMappingStore::open(config.storage.clone())
            .await
            .unwrap()
            .close()
            .await
            .unwrap();

        let result = check_database(&config).await;
        assert_eq!(result.status, CheckStatus::Pass);
        assert_eq!(result.message, "0 mapping(s)");
    }

    #[tokio::test]
    async fn discourse_without_key_fails() {
        let result = check_discourse(&ForumbridgeConfig::default()).await;
        assert_eq!(result.status, CheckStatus::Fail);
        assert!(result.message.contains("discourse.url"));
    }

    #[test]
    fn plain_lines_are_tagged() {
        let result = CheckResult {
            name: "Database".to_string(),
            status: CheckStatus::Warn,
            message: "not found".to_string(),
            duration: Duration::from_millis(3),
        };
        let line = format_line(&result, false);
        assert!(line.contains("[WARN]"));
        assert!(line.contains("Database"));
        assert!(line.ends_with("(3ms)"));
    }
}
