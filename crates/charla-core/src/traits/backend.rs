// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The backend seam the sync engine polls through.

use async_trait::async_trait;

use crate::error::CharlaError;
use crate::types::{ContactPage, ConversationId, ConversationMode, ConversationSnapshot, MessageId};

/// The remote store the console synchronizes against.
///
/// The engine never inspects transport details; it only branches on the
/// `Result` and on [`CharlaError::ExpiredToken`] as the structural signal
/// to halt polling. Implemented by the HTTP client in `charla-backend`
/// and by the scripted mock in `charla-test-utils`.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Fetches the most recent conversations (first page of the directory).
    async fn fetch_recent_contacts(&self) -> Result<ContactPage, CharlaError>;

    /// Fetches the conversations following the given already-known ids.
    async fn fetch_next_contacts(
        &self,
        known: &[ConversationId],
    ) -> Result<ContactPage, CharlaError>;

    /// Fetches a conversation's full message history and current state.
    async fn fetch_conversation(
        &self,
        conversation: &ConversationId,
    ) -> Result<ConversationSnapshot, CharlaError>;

    /// Fetches messages newer than `last_message`, or the whole recent
    /// window when no last-known id is given.
    async fn fetch_recent_messages(
        &self,
        conversation: &ConversationId,
        last_message: Option<&MessageId>,
    ) -> Result<ConversationSnapshot, CharlaError>;

    /// Switches a conversation between bot and human-agent control.
    /// The ack body is opaque; success is all the caller needs.
    async fn set_conversation_mode(
        &self,
        conversation: &ConversationId,
        mode: ConversationMode,
    ) -> Result<(), CharlaError>;

    /// Sends a human-agent text reply into the conversation.
    async fn send_agent_message(
        &self,
        conversation: &ConversationId,
        text: &str,
    ) -> Result<(), CharlaError>;
}
