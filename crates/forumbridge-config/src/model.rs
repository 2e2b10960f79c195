// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the forumbridge sync engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level forumbridge configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ForumbridgeConfig {
    /// Service-wide behavior settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Google Chat (origin platform) settings.
    #[serde(default)]
    pub google: GoogleConfig,

    /// Discourse (destination platform) settings.
    #[serde(default)]
    pub discourse: DiscourseConfig,

    /// Mapping store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Inbound webhook server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Handle derivation settings.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Retry/backoff policy for remote calls.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Explicit space -> category bindings.
    #[serde(default)]
    pub mappings: Vec<SpaceBinding>,
}

/// Service-wide behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds between periodic catch-up passes.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Maximum number of spaces synchronized concurrently within a pass.
    #[serde(default = "default_max_parallel_spaces")]
    pub max_parallel_spaces: usize,

    /// Sync every space visible to the service account, not only `[[mappings]]`.
    #[serde(default)]
    pub sync_all_spaces: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            poll_interval_secs: default_poll_interval_secs(),
            max_parallel_spaces: default_max_parallel_spaces(),
            sync_all_spaces: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_max_parallel_spaces() -> usize {
    4
}

/// Google Chat REST API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GoogleConfig {
    /// API base URL.
    #[serde(default = "default_google_api_base_url")]
    pub api_base_url: String,

    /// OAuth bearer token. Takes precedence over `token_file`.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Path to a JSON file with a `token` field, as written by the OAuth consent flow.
    #[serde(default)]
    pub token_file: Option<String>,

    /// Page size for list calls.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_google_api_base_url(),
            access_token: None,
            token_file: None,
            page_size: default_page_size(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_google_api_base_url() -> String {
    "https://chat.googleapis.com/v1".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Discourse API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DiscourseConfig {
    /// Forum base URL, e.g. `https://forum.example.com`.
    #[serde(default)]
    pub url: String,

    /// Admin API key (all-users scope, needed for impersonation).
    #[serde(default)]
    pub api_key: Option<String>,

    /// Service identity. Content authored by this user is never synced back.
    #[serde(default = "default_api_username")]
    pub api_username: String,

    /// Request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for DiscourseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: None,
            api_username: default_api_username(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_api_username() -> String {
    "system".to_string()
}

/// Mapping store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|d| d.join("forumbridge").join("forumbridge.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("forumbridge.db"))
        .display()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Inbound webhook server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Run the webhook listener alongside the periodic sync.
    #[serde(default = "default_gateway_enabled")]
    pub enabled: bool,

    /// Host address to bind to.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Shared secret for `X-Discourse-Event-Signature` verification.
    /// `None` accepts unsigned deliveries.
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: default_gateway_enabled(),
            host: default_gateway_host(),
            port: default_gateway_port(),
            webhook_secret: None,
        }
    }
}

fn default_gateway_enabled() -> bool {
    true
}

fn default_gateway_host() -> String {
    "0.0.0.0".to_string()
}

fn default_gateway_port() -> u16 {
    5000
}

/// Handle derivation rules for destination users.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    /// Minimum handle length accepted by the destination.
    #[serde(default = "default_min_length")]
    pub min_length: usize,

    /// Maximum handle length accepted by the destination.
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Domain for synthesized user emails.
    #[serde(default = "default_email_domain")]
    pub email_domain: String,

    /// Candidate handles tried before giving up.
    #[serde(default = "default_max_handle_attempts")]
    pub max_handle_attempts: u32,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            max_length: default_max_length(),
            email_domain: default_email_domain(),
            max_handle_attempts: default_max_handle_attempts(),
        }
    }
}

fn default_min_length() -> usize {
    3
}

fn default_max_length() -> usize {
    20
}

fn default_email_domain() -> String {
    "forumbridge.invalid".to_string()
}

fn default_max_handle_attempts() -> u32 {
    50
}

/// Retry/backoff policy for transient remote failures.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts per call, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles on each attempt.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for a single delay.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Randomize each delay by up to +/- this fraction (0.0 - 1.0).
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

fn default_max_attempts() -> u32 {
    4
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_jitter() -> f64 {
    0.2
}

/// Binds an origin space to a destination category.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SpaceBinding {
    /// Origin space resource name, e.g. `spaces/AAAA1234`.
    pub space_id: String,

    /// Existing category to use. When absent the category is found by name or created.
    #[serde(default)]
    pub category_id: Option<u64>,

    /// Parent category for a created category.
    #[serde(default)]
    pub parent_category_id: Option<u64>,
}
