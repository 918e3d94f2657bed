// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the sync engine, the HTTP backend, and the CLI.
//!
//! Raw `Raw*` structs mirror the backend wire payloads verbatim (Spanish
//! field names included); `Message` and `ContactSummary` are the formatted
//! shapes the UI renders from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a conversation, derived from the customer's
/// WhatsApp phone number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a message within a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored a message, normalized from the backend's raw sender string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// The end customer (raw sender `lead`).
    Contact,
    /// The automated bot (raw sender `bot`).
    Bot,
    /// A human advisor (raw sender `asesor_*`).
    HumanAgent,
}

impl Sender {
    /// Normalizes a raw sender string. Unknown senders are treated as the
    /// customer, matching the backend's loose contract.
    pub fn from_raw(raw: &str) -> Self {
        if raw == "bot" {
            Sender::Bot
        } else if raw.starts_with("asesor_") {
            Sender::HumanAgent
        } else {
            Sender::Contact
        }
    }
}

/// Whether a conversation is driven by the automated bot or a human agent.
///
/// Defaults to `Bot`: a human must explicitly take over.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationMode {
    #[default]
    Bot,
    Agent,
}

/// Kind of multimedia attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MultimediaKind {
    Image,
    Audio,
    Video,
    Document,
}

/// A multimedia attachment reference as the backend delivers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Multimedia {
    #[serde(rename = "type")]
    pub kind: MultimediaKind,
    pub multimedia_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// A message exactly as the backend returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
    pub sender: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multimedia: Option<Multimedia>,
}

/// The lead's collected state as stored by the bot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadState {
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default)]
    pub telefono: Option<String>,
    #[serde(default)]
    pub tipo_maquinaria: Option<String>,
    #[serde(default)]
    pub lugar_requerimiento: Option<String>,
    #[serde(default)]
    pub sitio_web: Option<String>,
    #[serde(default)]
    pub uso_empresa_o_venta: Option<String>,
    #[serde(default)]
    pub nombre_empresa: Option<String>,
    #[serde(default)]
    pub giro_empresa: Option<String>,
    #[serde(default)]
    pub correo: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

/// The subset of `LeadState` shown in the lead-details panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadInfo {
    pub nombre: Option<String>,
    pub telefono: Option<String>,
    pub tipo_maquinaria: Option<String>,
    pub lugar_requerimiento: Option<String>,
    pub sitio_web: Option<String>,
    pub uso_empresa_o_venta: Option<String>,
    pub nombre_empresa: Option<String>,
    pub giro_empresa: Option<String>,
    pub correo: Option<String>,
}

impl LeadState {
    /// Extracts the lead-details view, or `None` when every field is empty.
    pub fn lead_info(&self) -> Option<LeadInfo> {
        let has_data = self.nombre.is_some()
            || self.telefono.is_some()
            || self.tipo_maquinaria.is_some()
            || self.lugar_requerimiento.is_some()
            || self.sitio_web.is_some()
            || self.uso_empresa_o_venta.is_some()
            || self.nombre_empresa.is_some()
            || self.giro_empresa.is_some()
            || self.correo.is_some();

        has_data.then(|| LeadInfo {
            nombre: self.nombre.clone(),
            telefono: self.telefono.clone(),
            tipo_maquinaria: self.tipo_maquinaria.clone(),
            lugar_requerimiento: self.lugar_requerimiento.clone(),
            sitio_web: self.sitio_web.clone(),
            uso_empresa_o_venta: self.uso_empresa_o_venta.clone(),
            nombre_empresa: self.nombre_empresa.clone(),
            giro_empresa: self.giro_empresa.clone(),
            correo: self.correo.clone(),
        })
    }
}

/// A conversation record exactly as the contact endpoints return it.
///
/// Retained verbatim on each summary (`ContactSummary::source`) so the
/// preview and mode can be re-derived without another fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawConversation {
    pub id: String,
    #[serde(default)]
    pub lead_id: Option<String>,
    #[serde(default)]
    pub state: LeadState,
    #[serde(default)]
    pub conversation_mode: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub asignado_asesor: Option<String>,
}

/// One page of recent conversations from the contact endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactPage {
    #[serde(default)]
    pub conversations: Vec<RawConversation>,
    #[serde(default)]
    pub has_more: bool,
}

/// Response of the conversation and recent-messages endpoints: the
/// messages plus the conversation's current remote state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    #[serde(default)]
    pub messages: Vec<RawMessage>,
    #[serde(default)]
    pub conversation_mode: Option<String>,
    #[serde(default)]
    pub state: Option<LeadState>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A message formatted for display. Immutable once created; identity is
/// `id`, which deduplication keys on.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: MessageId,
    /// Display text, already prefixed per sender kind.
    pub text: String,
    pub sender: Sender,
    /// The unnormalized sender string, kept for reference.
    pub raw_sender: String,
    /// The backend timestamp verbatim.
    pub timestamp_raw: String,
    /// Parsed timestamp, when the raw value is RFC 3339.
    pub timestamp: Option<DateTime<Utc>>,
    /// `HH:MM` label for the bubble footer.
    pub time_label: String,
    /// `dd/mm/yyyy` label for the bubble footer.
    pub date_label: String,
    pub multimedia: Option<Multimedia>,
}

/// A conversation summary as the contact list renders it.
///
/// One summary per distinct conversation id. `updated_at` is the ordering
/// key (descending, missing last).
#[derive(Debug, Clone)]
pub struct ContactSummary {
    pub id: ConversationId,
    pub lead_id: Option<String>,
    pub name: String,
    pub phone: Option<String>,
    /// Initials shown in the avatar circle.
    pub avatar: String,
    /// Denormalized preview of the newest cached message.
    pub last_message: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub mode: ConversationMode,
    pub completed: bool,
    pub assigned_advisor: Option<String>,
    /// The last raw payload received for this conversation.
    pub source: RawConversation,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn sender_normalization() {
        assert_eq!(Sender::from_raw("lead"), Sender::Contact);
        assert_eq!(Sender::from_raw("bot"), Sender::Bot);
        assert_eq!(Sender::from_raw("asesor_maria"), Sender::HumanAgent);
        assert_eq!(Sender::from_raw("something_else"), Sender::Contact);
    }

    #[test]
    fn mode_defaults_to_bot_and_round_trips() {
        assert_eq!(ConversationMode::default(), ConversationMode::Bot);
        assert_eq!(ConversationMode::from_str("agent").unwrap(), ConversationMode::Agent);
        assert_eq!(ConversationMode::Agent.to_string(), "agent");
        assert!(ConversationMode::from_str("human").is_err());
    }

    #[test]
    fn raw_message_deserializes_with_multimedia() {
        let json = r#"{
            "id": "wamid.001",
            "text": "mira esta foto",
            "sender": "lead",
            "timestamp": "2024-06-01T10:00:00Z",
            "multimedia": {"type": "image", "multimedia_id": "media-9", "caption": "frente"}
        }"#;
        let msg: RawMessage = serde_json::from_str(json).unwrap();
        let mm = msg.multimedia.unwrap();
        assert_eq!(mm.kind, MultimediaKind::Image);
        assert_eq!(mm.caption.as_deref(), Some("frente"));
    }

    #[test]
    fn lead_info_is_none_when_state_is_empty() {
        assert!(LeadState::default().lead_info().is_none());

        let state = LeadState {
            nombre: Some("Ana".into()),
            ..LeadState::default()
        };
        let info = state.lead_info().unwrap();
        assert_eq!(info.nombre.as_deref(), Some("Ana"));
        assert!(info.correo.is_none());
    }

    #[test]
    fn snapshot_tolerates_missing_fields() {
        let snapshot: ConversationSnapshot = serde_json::from_str("{}").unwrap();
        assert!(snapshot.messages.is_empty());
        assert!(snapshot.conversation_mode.is_none());
    }
}
