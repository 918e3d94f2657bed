// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `charla contacts` command implementation.

use chrono::Utc;
use tracing::info;

use charla_config::CharlaConfig;
use charla_core::error::CharlaError;
use charla_engine::format;

/// Print the most recent lead conversations, newest first.
pub async fn run_contacts(config: CharlaConfig) -> Result<(), CharlaError> {
    let engine = crate::build_engine(config)?;
    let contacts = engine.load_recent_contacts().await?;
    let has_more = engine.has_more_contacts().await;

    if contacts.is_empty() {
        println!("No hay conversaciones recientes.");
        return Ok(());
    }

    let now = Utc::now();
    for contact in &contacts {
        let age = format::relative_age(contact.updated_at, now);
        println!(
            "[{}] {:<20} {:<14} {:<5} {:<18} {}",
            contact.avatar,
            contact.name,
            contact.phone.as_deref().unwrap_or(""),
            contact.mode,
            age,
            contact.last_message,
        );
    }
    if has_more {
        println!("... hay más conversaciones (cargar más)");
    }

    info!(contacts = contacts.len(), "contacts listed");
    Ok(())
}
