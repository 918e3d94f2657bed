// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `charla send` command implementation.

use charla_config::CharlaConfig;
use charla_core::error::CharlaError;
use charla_core::types::ConversationId;

/// Send a human-agent text reply into a conversation.
pub async fn run_send(
    config: CharlaConfig,
    conversation_id: String,
    message: String,
) -> Result<(), CharlaError> {
    let engine = crate::build_engine(config)?;
    let conversation = ConversationId(conversation_id);

    engine.send_agent_message(&conversation, &message).await?;
    println!("Mensaje enviado a {conversation}.");
    Ok(())
}
