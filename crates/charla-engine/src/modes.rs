// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation mode registry: the source of truth the chat panel
//! renders from. Entries are written only from remote-confirmed data,
//! never optimistically ahead of a mutation acknowledgment.

use std::collections::HashMap;

use charla_core::types::{ConversationId, ConversationMode};

#[derive(Debug, Default)]
pub struct ConversationModeRegistry {
    modes: HashMap<ConversationId, ConversationMode>,
}

impl ConversationModeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode, defaulting to `Bot` when absent: humans must
    /// explicitly opt in to taking over.
    pub fn get(&self, conversation: &ConversationId) -> ConversationMode {
        self.modes.get(conversation).copied().unwrap_or_default()
    }

    /// Write a remote-confirmed mode.
    pub fn set(&mut self, conversation: ConversationId, mode: ConversationMode) {
        self.modes.insert(conversation, mode);
    }

    /// Seed from a known summary on first activation only; an existing
    /// entry may be more current and is never overwritten here.
    pub fn seed_if_absent(&mut self, conversation: ConversationId, mode: ConversationMode) {
        self.modes.entry(conversation).or_insert(mode);
    }

    pub fn clear(&mut self) {
        self.modes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conv(id: &str) -> ConversationId {
        ConversationId(id.to_string())
    }

    #[test]
    fn absent_entries_default_to_bot() {
        let registry = ConversationModeRegistry::new();
        assert_eq!(registry.get(&conv("c1")), ConversationMode::Bot);
    }

    #[test]
    fn seed_never_overwrites_an_existing_entry() {
        let mut registry = ConversationModeRegistry::new();
        registry.set(conv("c1"), ConversationMode::Agent);
        registry.seed_if_absent(conv("c1"), ConversationMode::Bot);
        assert_eq!(registry.get(&conv("c1")), ConversationMode::Agent);

        registry.seed_if_absent(conv("c2"), ConversationMode::Agent);
        assert_eq!(registry.get(&conv("c2")), ConversationMode::Agent);
    }
}
