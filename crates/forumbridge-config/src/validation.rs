// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as valid bind addresses, handle length bounds, and unique space bindings.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::ForumbridgeConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ForumbridgeConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(validation("storage.database_path must not be empty"));
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(validation("gateway.host must not be empty"));
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(validation(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            )));
        }
    }

    if config.service.poll_interval_secs == 0 {
        errors.push(validation("service.poll_interval_secs must be at least 1"));
    }

    if config.service.max_parallel_spaces == 0 {
        errors.push(validation("service.max_parallel_spaces must be at least 1"));
    }

    let identity = &config.identity;
    if identity.min_length == 0 {
        errors.push(validation("identity.min_length must be at least 1"));
    }
    if identity.min_length > identity.max_length {
        errors.push(validation(format!(
            "identity.min_length ({}) must not exceed identity.max_length ({})",
            identity.min_length, identity.max_length
        )));
    }
    if identity.email_domain.trim().is_empty() || identity.email_domain.contains('@') {
        errors.push(validation(format!(
            "identity.email_domain `{}` must be a bare domain name",
            identity.email_domain
        )));
    }
    if identity.max_handle_attempts == 0 {
        errors.push(validation("identity.max_handle_attempts must be at least 1"));
    }

    let retry = &config.retry;
    if retry.max_attempts == 0 {
        errors.push(validation("retry.max_attempts must be at least 1"));
    }
    if !(0.0..=1.0).contains(&retry.jitter) {
        errors.push(validation(format!(
            "retry.jitter must be between 0.0 and 1.0, got {}",
            retry.jitter
        )));
    }
    if retry.base_delay_ms > retry.max_delay_ms {
        errors.push(validation(format!(
            "retry.base_delay_ms ({}) must not exceed retry.max_delay_ms ({})",
            retry.base_delay_ms, retry.max_delay_ms
        )));
    }

    if !config.discourse.url.is_empty()
        && !(config.discourse.url.starts_with("http://")
            || config.discourse.url.starts_with("https://"))
    {
        errors.push(validation(format!(
            "discourse.url `{}` must start with http:// or https://",
            config.discourse.url
        )));
    }

    let mut seen_spaces = HashSet::new();
    for (i, binding) in config.mappings.iter().enumerate() {
        if !binding.space_id.starts_with("spaces/") {
            errors.push(validation(format!(
                "mappings[{i}].space_id `{}` must look like `spaces/<id>`",
                binding.space_id
            )));
        }
        if !seen_spaces.insert(&binding.space_id) {
            errors.push(validation(format!(
                "duplicate space_id `{}` in [[mappings]] array",
                binding.space_id
            )));
        }
        if binding.category_id.is_some() && binding.parent_category_id.is_some() {
            errors.push(validation(format!(
                "mappings[{i}] sets both category_id and parent_category_id; use one"
            )));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check that credentials for both platforms are present.
///
/// Only commands that talk to the platforms need this; `mappings` and
/// `status` run without credentials.
pub fn validate_credentials(config: &ForumbridgeConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.discourse.url.trim().is_empty() {
        errors.push(ConfigError::MissingKey {
            key: "discourse.url".to_string(),
        });
    }
    if config.discourse.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
        errors.push(ConfigError::MissingKey {
            key: "discourse.api_key".to_string(),
        });
    }
    if config.discourse.api_username.trim().is_empty() {
        errors.push(validation("discourse.api_username must not be empty"));
    }
    if config.google.access_token.is_none() && config.google.token_file.is_none() {
        errors.push(ConfigError::MissingKey {
            key: "google.access_token".to_string(),
        });
    }
    if config.mappings.is_empty() && !config.service.sync_all_spaces {
        errors.push(validation(
            "no spaces to sync: add [[mappings]] entries or set service.sync_all_spaces = true",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validation(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SpaceBinding;

    fn binding(space_id: &str) -> SpaceBinding {
        SpaceBinding {
            space_id: space_id.to_string(),
            category_id: None,
            parent_category_id: None,
        }
    }

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        let config = ForumbridgeConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = ForumbridgeConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "database_path"));
    }

    #[test]
    fn inverted_handle_bounds_fail_validation() {
        let mut config = ForumbridgeConfig::default();
        config.identity.min_length = 10;
        config.identity.max_length = 5;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "identity.min_length"));
    }

    #[test]
    fn jitter_out_of_range_fails_validation() {
        let mut config = ForumbridgeConfig::default();
        config.retry.jitter = 1.5;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "retry.jitter"));
    }

    #[test]
    fn duplicate_space_bindings_fail_validation() {
        let mut config = ForumbridgeConfig::default();
        config.mappings = vec![binding("spaces/AAA"), binding("spaces/AAA")];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "duplicate space_id"));
    }

    #[test]
    fn malformed_space_id_fails_validation() {
        let mut config = ForumbridgeConfig::default();
        config.mappings = vec![binding("AAA")];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "spaces/<id>"));
    }

    #[test]
    fn discourse_url_requires_scheme() {
        let mut config = ForumbridgeConfig::default();
        config.discourse.url = "forum.example.com".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "discourse.url"));
    }

    #[test]
    fn missing_credentials_are_all_reported() {
        let config = ForumbridgeConfig::default();
        let errors = validate_credentials(&config).unwrap_err();
        let missing: Vec<_> = errors
            .iter()
            .filter_map(|e| match e {
                ConfigError::MissingKey { key } => Some(key.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            missing,
            vec!["discourse.url", "discourse.api_key", "google.access_token"]
        );
        assert!(has_message(&errors, "no spaces to sync"));
    }

    #[test]
    fn complete_credentials_pass() {
        let mut config = ForumbridgeConfig::default();
        config.discourse.url = "https://forum.example.com".to_string();
        config.discourse.api_key = Some("key".to_string());
        config.google.token_file = Some("token.json".to_string());
        config.mappings = vec![binding("spaces/AAA")];
        assert!(validate_credentials(&config).is_ok());
    }
}
