// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `charla mode` command implementation.

use charla_config::CharlaConfig;
use charla_core::error::CharlaError;
use charla_core::types::{ConversationId, ConversationMode};

/// Switch a conversation between bot and human-agent control.
pub async fn run_mode(
    config: CharlaConfig,
    conversation_id: String,
    mode: ConversationMode,
) -> Result<(), CharlaError> {
    let engine = crate::build_engine(config)?;
    let conversation = ConversationId(conversation_id);

    engine.set_mode(&conversation, mode).await?;
    println!("Conversación {conversation} ahora en modo {mode}.");
    Ok(())
}
