// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./forumbridge.toml` > `~/.config/forumbridge/forumbridge.toml` >
//! `/etc/forumbridge/forumbridge.toml` with environment variable overrides via `FORUMBRIDGE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ForumbridgeConfig;

/// Top-level sections that environment variables can address.
const ENV_SECTIONS: &[&str] = &[
    "service",
    "google",
    "discourse",
    "storage",
    "gateway",
    "identity",
    "retry",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/forumbridge/forumbridge.toml` (system-wide)
/// 3. `~/.config/forumbridge/forumbridge.toml` (user XDG config)
/// 4. `./forumbridge.toml` (local directory)
/// 5. `FORUMBRIDGE_*` environment variables
pub fn load_config() -> Result<ForumbridgeConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<ForumbridgeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ForumbridgeConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ForumbridgeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ForumbridgeConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ForumbridgeConfig::default()))
        .merge(Toml::file("/etc/forumbridge/forumbridge.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("forumbridge/forumbridge.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("forumbridge.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `FORUMBRIDGE_DISCOURSE_API_KEY` maps to `discourse.api_key`.
fn env_provider() -> Env {
    Env::prefixed("FORUMBRIDGE_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env var name to a dotted config path.
pub fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(map_env_key("discourse_api_key"), "discourse.api_key");
        assert_eq!(map_env_key("service_poll_interval_secs"), "service.poll_interval_secs");
        assert_eq!(map_env_key("gateway_webhook_secret"), "gateway.webhook_secret");
        assert_eq!(map_env_key("unknown_thing"), "unknown_thing");
    }
}
