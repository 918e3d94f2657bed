// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Charla console.
//!
//! Layered TOML configuration via Figment with XDG hierarchy support,
//! environment variable overrides, and rich miette diagnostics for
//! unknown keys, type errors, and semantic validation failures.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, figment_to_config_errors, render_errors, suggest_key};
pub use loader::{build_figment, load_config, load_config_from_path, load_config_from_str};
pub use model::{BackendConfig, CharlaConfig, ConsoleConfig, PollingConfig};
pub use validation::validate_config;

use std::path::PathBuf;

/// Load configuration from the XDG hierarchy, convert any figment errors
/// to rich diagnostics, and run semantic validation.
///
/// This is the entry point used by the binary: a single call producing
/// either a validated config or a list of renderable [`ConfigError`]s.
pub fn load_and_validate() -> Result<CharlaConfig, Vec<ConfigError>> {
    let sources = collect_toml_sources();
    let config = load_config().map_err(|e| figment_to_config_errors(e, &sources))?;
    validate_config(&config)?;
    Ok(config)
}

/// Load and validate configuration from a TOML string (no XDG lookup).
pub fn load_and_validate_str(toml_content: &str) -> Result<CharlaConfig, Vec<ConfigError>> {
    let sources = vec![("charla.toml".to_string(), toml_content.to_string())];
    let config = load_config_from_str(toml_content).map_err(|e| figment_to_config_errors(e, &sources))?;
    validate_config(&config)?;
    Ok(config)
}

/// Read the contents of every TOML file in the XDG hierarchy that exists.
///
/// Used to attach source spans to diagnostics; files that cannot be read
/// are silently skipped since figment already handled the actual load.
fn collect_toml_sources() -> Vec<(String, String)> {
    let mut paths: Vec<PathBuf> = vec![PathBuf::from("/etc/charla/charla.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("charla/charla.toml"));
    }
    paths.push(PathBuf::from("charla.toml"));

    paths
        .into_iter()
        .filter_map(|path| {
            std::fs::read_to_string(&path)
                .ok()
                .map(|content| (path.display().to_string(), content))
        })
        .collect()
}
