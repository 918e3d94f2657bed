// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./charla.toml` > `~/.config/charla/charla.toml` > `/etc/charla/charla.toml`
//! with environment variable overrides via `CHARLA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CharlaConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/charla/charla.toml` (system-wide)
/// 3. `~/.config/charla/charla.toml` (user XDG config)
/// 4. `./charla.toml` (local directory)
/// 5. `CHARLA_*` environment variables
pub fn load_config() -> Result<CharlaConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<CharlaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CharlaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CharlaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CharlaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(CharlaConfig::default()))
        .merge(Toml::file("/etc/charla/charla.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("charla/charla.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("charla.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `CHARLA_BACKEND_ACCESS_TOKEN` must map
/// to `backend.access_token`, not `backend.access.token`.
fn env_provider() -> Env {
    Env::prefixed("CHARLA_").map(|key| {
        // `key` is the env var name with prefix stripped, still in its
        // original (upper) case; figment lowercases only after mapping.
        // Example: CHARLA_BACKEND_ACCESS_TOKEN -> "BACKEND_ACCESS_TOKEN"
        let key_str = key.as_str().to_ascii_lowercase();
        let mapped = key_str
            .replacen("console_", "console.", 1)
            .replacen("backend_", "backend.", 1)
            .replacen("polling_", "polling.", 1);
        mapped.into()
    })
}
