// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-conversation message cache with a terminal-failure set.
//!
//! Messages are stored in arrival order and deduplicated by id on
//! append. Conversations that failed to load are marked in a failure
//! set so repeat loads short-circuit until an explicit forced refresh.

use std::collections::{HashMap, HashSet};

use charla_core::types::{ConversationId, Message, MessageId, RawMessage};

use crate::format;

/// Counts reported by [`MessageCache::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Conversations with a successfully loaded message list.
    pub cached: usize,
    /// Conversations in the terminal-failure set.
    pub failed: usize,
}

/// In-memory store of fetched messages, keyed by conversation.
///
/// The failure mark is authoritative: a failed conversation also holds
/// an empty list (so rendering never sees a missing entry) but counts
/// as cached-failure, not cached-success, until the mark is cleared.
#[derive(Debug, Default)]
pub struct MessageCache {
    entries: HashMap<ConversationId, Vec<Message>>,
    failed: HashSet<ConversationId>,
}

impl MessageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached messages for a conversation, if any entry exists.
    pub fn get(&self, conversation: &ConversationId) -> Option<&[Message]> {
        self.entries.get(conversation).map(Vec::as_slice)
    }

    /// The newest cached message for a conversation.
    pub fn newest(&self, conversation: &ConversationId) -> Option<&Message> {
        self.entries.get(conversation).and_then(|msgs| msgs.last())
    }

    /// The id of the newest cached message, used as the delta cursor.
    pub fn last_message_id(&self, conversation: &ConversationId) -> Option<&MessageId> {
        self.newest(conversation).map(|msg| &msg.id)
    }

    /// Whether this conversation loaded successfully and has an entry.
    pub fn is_cached(&self, conversation: &ConversationId) -> bool {
        self.entries.contains_key(conversation) && !self.failed.contains(conversation)
    }

    /// Whether this conversation is in the terminal-failure set.
    pub fn is_failed(&self, conversation: &ConversationId) -> bool {
        self.failed.contains(conversation)
    }

    /// Store a freshly fetched message list, clearing any failure mark.
    pub fn insert(&mut self, conversation: ConversationId, messages: Vec<Message>) {
        self.failed.remove(&conversation);
        self.entries.insert(conversation, messages);
    }

    /// Record a terminal load failure. An empty list is stored alongside
    /// the mark so downstream rendering never sees a missing entry.
    pub fn mark_failed(&mut self, conversation: ConversationId) {
        self.entries.entry(conversation.clone()).or_default();
        self.failed.insert(conversation);
    }

    /// Clear a failure mark ahead of a forced refresh.
    pub fn clear_failure(&mut self, conversation: &ConversationId) {
        self.failed.remove(conversation);
    }

    /// Append raw messages, formatting each and deduplicating by id.
    ///
    /// Existing entries are never reordered; accepted messages keep
    /// their arrival order. Returns the messages actually appended.
    pub fn append_raw(
        &mut self,
        conversation: &ConversationId,
        raw_messages: &[RawMessage],
    ) -> Vec<Message> {
        let entry = self.entries.entry(conversation.clone()).or_default();
        let known: HashSet<MessageId> = entry.iter().map(|m| m.id.clone()).collect();

        let mut accepted = Vec::new();
        let mut seen = known;
        for raw in raw_messages {
            let id = MessageId(raw.id.clone());
            if seen.contains(&id) {
                continue;
            }
            seen.insert(id);
            let formatted = format::format_message(raw);
            entry.push(formatted.clone());
            accepted.push(formatted);
        }
        accepted
    }

    /// Append one already-formatted message; returns false on duplicate.
    pub fn append_message(&mut self, conversation: &ConversationId, message: Message) -> bool {
        let entry = self.entries.entry(conversation.clone()).or_default();
        if entry.iter().any(|m| m.id == message.id) {
            return false;
        }
        entry.push(message);
        true
    }

    /// Wipe everything: entries and failure marks. Used on logout.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.failed.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            cached: self
                .entries
                .keys()
                .filter(|id| !self.failed.contains(id))
                .count(),
            failed: self.failed.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conv(id: &str) -> ConversationId {
        ConversationId(id.to_string())
    }

    fn raw(id: &str, text: &str) -> RawMessage {
        RawMessage {
            id: id.to_string(),
            text: Some(text.to_string()),
            sender: "lead".to_string(),
            timestamp: "2024-06-01T10:00:00Z".to_string(),
            multimedia: None,
        }
    }

    #[test]
    fn append_deduplicates_by_id_in_first_seen_order() {
        let mut cache = MessageCache::new();
        let c = conv("c1");

        cache.append_raw(&c, &[raw("m1", "uno"), raw("m2", "dos")]);
        let accepted = cache.append_raw(&c, &[raw("m2", "dos"), raw("m3", "tres"), raw("m1", "uno")]);

        assert_eq!(accepted.len(), 1);
        let ids: Vec<&str> = cache.get(&c).unwrap().iter().map(|m| m.id.0.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn duplicates_within_one_batch_are_dropped() {
        let mut cache = MessageCache::new();
        let c = conv("c1");
        cache.append_raw(&c, &[raw("m1", "uno"), raw("m1", "uno")]);
        assert_eq!(cache.get(&c).unwrap().len(), 1);
    }

    #[test]
    fn failure_mark_and_success_are_mutually_exclusive() {
        let mut cache = MessageCache::new();
        let c = conv("c1");

        cache.mark_failed(c.clone());
        assert!(cache.is_failed(&c));
        assert!(!cache.is_cached(&c));
        assert_eq!(cache.get(&c).map(<[Message]>::len), Some(0));

        cache.insert(c.clone(), Vec::new());
        assert!(!cache.is_failed(&c));
        assert!(cache.is_cached(&c));
    }

    #[test]
    fn last_message_id_tracks_the_newest_entry() {
        let mut cache = MessageCache::new();
        let c = conv("c1");
        assert!(cache.last_message_id(&c).is_none());

        cache.append_raw(&c, &[raw("m1", "uno"), raw("m2", "dos")]);
        assert_eq!(cache.last_message_id(&c).unwrap().0, "m2");
    }

    #[test]
    fn clear_wipes_entries_and_failure_marks() {
        let mut cache = MessageCache::new();
        cache.append_raw(&conv("c1"), &[raw("m1", "uno")]);
        cache.mark_failed(conv("c2"));
        assert_eq!(cache.stats(), CacheStats { cached: 1, failed: 1 });

        cache.clear();
        assert_eq!(cache.stats(), CacheStats { cached: 0, failed: 0 });
        assert!(cache.get(&conv("c1")).is_none());
    }
}
