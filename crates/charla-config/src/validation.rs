// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as well-formed endpoint URLs and coherent timer windows.

use crate::diagnostic::ConfigError;
use crate::model::CharlaConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CharlaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.console.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "console.log_level must be one of trace/debug/info/warn/error, got `{}`",
                config.console.log_level
            ),
        });
    }

    if config.console.operator.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "console.operator must not be empty".to_string(),
        });
    }

    let endpoints = [
        ("backend.recent_contacts_url", &config.backend.recent_contacts_url),
        ("backend.next_contacts_url", &config.backend.next_contacts_url),
        ("backend.conversation_url", &config.backend.conversation_url),
        ("backend.recent_messages_url", &config.backend.recent_messages_url),
        ("backend.conversation_mode_url", &config.backend.conversation_mode_url),
        ("backend.agent_message_url", &config.backend.agent_message_url),
    ];
    for (key, url) in endpoints {
        if let Some(url) = url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                errors.push(ConfigError::Validation {
                    message: format!("{key} must be an http(s) URL, got `{url}`"),
                });
            }
        }
    }

    if config.backend.request_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "backend.request_timeout_secs must be at least 1".to_string(),
        });
    }

    if config.polling.message_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "polling.message_interval_secs must be at least 1".to_string(),
        });
    }

    if config.polling.contact_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "polling.contact_interval_secs must be at least 1".to_string(),
        });
    }

    // An idle window shorter than the interval would suspend before the
    // first tick ever fires.
    if config.polling.message_idle_timeout_secs < config.polling.message_interval_secs {
        errors.push(ConfigError::Validation {
            message: format!(
                "polling.message_idle_timeout_secs ({}) must be >= polling.message_interval_secs ({})",
                config.polling.message_idle_timeout_secs, config.polling.message_interval_secs
            ),
        });
    }

    if config.polling.contact_idle_timeout_secs < config.polling.contact_interval_secs {
        errors.push(ConfigError::Validation {
            message: format!(
                "polling.contact_idle_timeout_secs ({}) must be >= polling.contact_interval_secs ({})",
                config.polling.contact_idle_timeout_secs, config.polling.contact_interval_secs
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = CharlaConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn bad_log_level_fails_validation() {
        let mut config = CharlaConfig::default();
        config.console.log_level = "verbose".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("log_level"))));
    }

    #[test]
    fn non_http_endpoint_fails_validation() {
        let mut config = CharlaConfig::default();
        config.backend.conversation_url = Some("ftp://backend/conv".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("conversation_url"))));
    }

    #[test]
    fn idle_window_shorter_than_interval_fails_validation() {
        let mut config = CharlaConfig::default();
        config.polling.message_interval_secs = 30;
        config.polling.message_idle_timeout_secs = 10;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("message_idle_timeout_secs"))));
    }

    #[test]
    fn zero_interval_fails_validation() {
        let mut config = CharlaConfig::default();
        config.polling.contact_interval_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("contact_interval_secs"))));
    }

    #[test]
    fn valid_custom_config_passes() {
        let mut config = CharlaConfig::default();
        config.backend.recent_contacts_url = Some("https://backend/leads/recent".to_string());
        config.backend.access_token = Some("tok-123".to_string());
        config.polling.echo_threshold_ms = 500;
        assert!(validate_config(&config).is_ok());
    }
}
