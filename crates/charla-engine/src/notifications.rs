// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pending-notification ledger for the contact list badges.
//!
//! The contact-level poller records a marker when it observes a change
//! to a conversation the operator does not have open; opening that
//! conversation consumes the marker.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use charla_core::types::ConversationId;

/// What kind of directory change raised the badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// A conversation id not previously in the directory.
    NewContact,
    /// A known conversation whose `updated_at` moved.
    UpdatedContact,
}

/// A pending badge for one conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct NotificationLedger {
    pending: HashMap<ConversationId, Notification>,
}

impl NotificationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a badge; a newer observation replaces an older one.
    pub fn record(&mut self, conversation: ConversationId, kind: NotificationKind, at: DateTime<Utc>) {
        self.pending.insert(conversation, Notification { kind, at });
    }

    pub fn get(&self, conversation: &ConversationId) -> Option<Notification> {
        self.pending.get(conversation).copied()
    }

    /// Consume the badge for a conversation; selection acknowledges it.
    pub fn take(&mut self, conversation: &ConversationId) -> Option<Notification> {
        self.pending.remove(conversation)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
