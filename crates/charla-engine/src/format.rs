// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure formatting helpers: raw backend records in, display shapes out.
//!
//! All display defaults live here so the rest of the engine never
//! branches on missing fields: absent name is "Nuevo lead", absent
//! initials a single space, an unloaded preview
//! "Presione para visualizar...".

use chrono::{DateTime, Utc};

use charla_core::types::{
    ContactSummary, ConversationId, ConversationMode, Message, MessageId, RawConversation,
    RawMessage, Sender,
};

/// Display name for a contact whose lead state has no name yet.
pub const NEW_LEAD_NAME: &str = "Nuevo lead";

/// Preview shown before a conversation's messages are first loaded.
pub const UNLOADED_PREVIEW: &str = "Presione para visualizar...";

/// Preview for a message that is an attachment with no text.
pub const MULTIMEDIA_PREVIEW: &str = "Mensaje multimedia";

/// Maximum preview length in characters before truncation.
pub const PREVIEW_MAX_CHARS: usize = 50;

const BOT_PREFIX: &str = "🤖 ";
const AGENT_PREFIX: &str = "👤 ";

/// Format a raw backend message for display.
///
/// Bot and human-agent messages get an emoji prefix so bubbles are
/// distinguishable at a glance; timestamps are parsed as RFC 3339 when
/// possible, with the raw string retained either way.
pub fn format_message(raw: &RawMessage) -> Message {
    let sender = Sender::from_raw(&raw.sender);
    let body = raw.text.clone().unwrap_or_default();
    let text = match sender {
        Sender::Bot => format!("{BOT_PREFIX}{body}"),
        Sender::HumanAgent => format!("{AGENT_PREFIX}{body}"),
        Sender::Contact => body,
    };

    let timestamp = parse_timestamp(&raw.timestamp);
    let (time_label, date_label) = match timestamp {
        Some(ts) => (
            ts.format("%H:%M").to_string(),
            ts.format("%d/%m/%Y").to_string(),
        ),
        None => (String::new(), String::new()),
    };

    Message {
        id: MessageId(raw.id.clone()),
        text,
        sender,
        raw_sender: raw.sender.clone(),
        timestamp_raw: raw.timestamp.clone(),
        timestamp,
        time_label,
        date_label,
        multimedia: raw.multimedia.clone(),
    }
}

/// Format a contact summary from its last raw payload plus the newest
/// cached message (if any) for the preview line.
pub fn format_summary(raw: &RawConversation, newest: Option<&Message>) -> ContactSummary {
    let name = raw
        .state
        .nombre
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| NEW_LEAD_NAME.to_string());

    let phone = raw.state.telefono.clone().or_else(|| Some(raw.id.clone()));

    let mode = raw
        .conversation_mode
        .as_deref()
        .and_then(|m| m.parse::<ConversationMode>().ok())
        .unwrap_or_default();

    ContactSummary {
        id: ConversationId(raw.id.clone()),
        lead_id: raw.lead_id.clone(),
        avatar: initials(&name),
        name,
        phone,
        last_message: newest.map(message_preview).unwrap_or_else(|| UNLOADED_PREVIEW.to_string()),
        updated_at: raw.updated_at.as_deref().and_then(parse_timestamp),
        mode,
        completed: raw.state.completed,
        assigned_advisor: raw.asignado_asesor.clone(),
        source: raw.clone(),
    }
}

/// Derive the contact-list preview from a message.
///
/// Agent replies are prefixed `Tú: ` so the operator recognizes their
/// own last word; attachments without text show a fixed label.
pub fn message_preview(msg: &Message) -> String {
    let body = msg
        .text
        .strip_prefix(BOT_PREFIX)
        .or_else(|| msg.text.strip_prefix(AGENT_PREFIX))
        .unwrap_or(&msg.text);

    let body = if body.trim().is_empty() && msg.multimedia.is_some() {
        MULTIMEDIA_PREVIEW.to_string()
    } else {
        truncate_preview(body)
    };

    match msg.sender {
        Sender::HumanAgent => format!("Tú: {body}"),
        _ => body,
    }
}

/// Truncate a preview to [`PREVIEW_MAX_CHARS`] characters, appending an
/// ellipsis when shortened. Counts chars, not bytes, so multibyte text
/// never splits mid-character.
pub fn truncate_preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_MAX_CHARS {
        let cut: String = text.chars().take(PREVIEW_MAX_CHARS).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

/// Avatar initials: first letter of the first two words, uppercased.
/// A blank name yields a single space so the avatar circle still renders.
pub fn initials(name: &str) -> String {
    let letters: String = name
        .split_whitespace()
        .take(2)
        .filter_map(|word| word.chars().next())
        .flat_map(|c| c.to_uppercase())
        .collect();

    if letters.is_empty() {
        " ".to_string()
    } else {
        letters
    }
}

/// Relative age label for the contact list: "Hace unos minutos" under an
/// hour, then whole hours, then whole days. Empty when the timestamp is
/// unknown or in the future.
pub fn relative_age(updated_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(ts) = updated_at else {
        return String::new();
    };
    let elapsed = now.signed_duration_since(ts);
    if elapsed.num_seconds() < 0 {
        return String::new();
    }
    if elapsed.num_hours() < 1 {
        "Hace unos minutos".to_string()
    } else if elapsed.num_hours() < 24 {
        format!("Hace {}h", elapsed.num_hours())
    } else {
        format!("Hace {}d", elapsed.num_days())
    }
}

/// Parse a backend timestamp (RFC 3339) into UTC, tolerating absence of
/// an offset suffix by rejecting rather than guessing.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
