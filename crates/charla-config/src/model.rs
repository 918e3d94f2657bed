// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Charla console.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Charla configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CharlaConfig {
    /// Console identity and logging settings.
    #[serde(default)]
    pub console: ConsoleConfig,

    /// REST backend endpoints and credential.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Polling intervals, inactivity windows, and the echo threshold.
    #[serde(default)]
    pub polling: PollingConfig,
}

/// Console identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConsoleConfig {
    /// Display name of the operator, used as the advisor sender id
    /// (`asesor_<name>`) on outbound messages.
    #[serde(default = "default_operator")]
    pub operator: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            operator: default_operator(),
            log_level: default_log_level(),
        }
    }
}

fn default_operator() -> String {
    "operador".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// REST backend configuration: one URL per fixed endpoint plus the
/// bearer credential obtained at login.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// GET endpoint returning the most recent conversations.
    #[serde(default)]
    pub recent_contacts_url: Option<String>,

    /// POST endpoint returning conversations after a set of known ids.
    #[serde(default)]
    pub next_contacts_url: Option<String>,

    /// POST endpoint returning a full conversation by wa_id.
    #[serde(default)]
    pub conversation_url: Option<String>,

    /// POST endpoint returning messages newer than a last-known id.
    #[serde(default)]
    pub recent_messages_url: Option<String>,

    /// POST endpoint switching a conversation between bot and agent.
    #[serde(default)]
    pub conversation_mode_url: Option<String>,

    /// POST endpoint delivering a human-agent reply.
    #[serde(default)]
    pub agent_message_url: Option<String>,

    /// Bearer access token. `None` sends unauthenticated requests, which
    /// the backend will reject with the expired-token sentinel.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            recent_contacts_url: None,
            next_contacts_url: None,
            conversation_url: None,
            recent_messages_url: None,
            conversation_mode_url: None,
            agent_message_url: None,
            access_token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Polling configuration for both timer families.
///
/// The echo threshold is a heuristic tolerance, not a protocol guarantee,
/// so it is configurable rather than hard-coded.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PollingConfig {
    /// Interval between delta fetches for the active conversation.
    #[serde(default = "default_message_interval_secs")]
    pub message_interval_secs: u64,

    /// Inactivity window after which message polling auto-suspends.
    #[serde(default = "default_message_idle_timeout_secs")]
    pub message_idle_timeout_secs: u64,

    /// Interval between directory-wide contact polls.
    #[serde(default = "default_contact_interval_secs")]
    pub contact_interval_secs: u64,

    /// Inactivity window after which contact polling auto-suspends.
    #[serde(default = "default_contact_idle_timeout_secs")]
    pub contact_idle_timeout_secs: u64,

    /// `updated_at` deltas at or below this are treated as echoes of the
    /// operator's own actions and raise no notification.
    #[serde(default = "default_echo_threshold_ms")]
    pub echo_threshold_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            message_interval_secs: default_message_interval_secs(),
            message_idle_timeout_secs: default_message_idle_timeout_secs(),
            contact_interval_secs: default_contact_interval_secs(),
            contact_idle_timeout_secs: default_contact_idle_timeout_secs(),
            echo_threshold_ms: default_echo_threshold_ms(),
        }
    }
}

impl PollingConfig {
    /// Message-level poll interval as a [`Duration`].
    pub fn message_interval(&self) -> Duration {
        Duration::from_secs(self.message_interval_secs)
    }

    /// Message-level inactivity window as a [`Duration`].
    pub fn message_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.message_idle_timeout_secs)
    }

    /// Contact-level poll interval as a [`Duration`].
    pub fn contact_interval(&self) -> Duration {
        Duration::from_secs(self.contact_interval_secs)
    }

    /// Contact-level inactivity window as a [`Duration`].
    pub fn contact_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.contact_idle_timeout_secs)
    }

    /// Echo-suppression threshold as a [`Duration`].
    pub fn echo_threshold(&self) -> Duration {
        Duration::from_millis(self.echo_threshold_ms)
    }
}

fn default_message_interval_secs() -> u64 {
    15
}

fn default_message_idle_timeout_secs() -> u64 {
    300
}

fn default_contact_interval_secs() -> u64 {
    60
}

fn default_contact_idle_timeout_secs() -> u64 {
    600
}

fn default_echo_threshold_ms() -> u64 {
    2000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polling_defaults_match_the_console_tiers() {
        let polling = PollingConfig::default();
        assert_eq!(polling.message_interval(), Duration::from_secs(15));
        assert_eq!(polling.message_idle_timeout(), Duration::from_secs(300));
        assert_eq!(polling.contact_interval(), Duration::from_secs(60));
        assert_eq!(polling.contact_idle_timeout(), Duration::from_secs(600));
        assert_eq!(polling.echo_threshold(), Duration::from_millis(2000));
    }

    #[test]
    fn backend_defaults_have_no_endpoints() {
        let backend = BackendConfig::default();
        assert!(backend.recent_contacts_url.is_none());
        assert!(backend.access_token.is_none());
        assert_eq!(backend.request_timeout_secs, 30);
    }
}
