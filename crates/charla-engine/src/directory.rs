// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The ordered contact directory.
//!
//! Summaries are unique by conversation id. Ordering is `updated_at`
//! descending with missing values last; the sort is stable so equal
//! keys keep their relative order.

use chrono::{DateTime, Utc};

use charla_core::types::{ContactSummary, ConversationId};

/// Ordered collection of contact summaries, one per conversation.
#[derive(Debug, Default)]
pub struct ContactDirectory {
    contacts: Vec<ContactSummary>,
}

impl ContactDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contacts(&self) -> &[ContactSummary] {
        &self.contacts
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn ids(&self) -> Vec<ConversationId> {
        self.contacts.iter().map(|c| c.id.clone()).collect()
    }

    pub fn get(&self, id: &ConversationId) -> Option<&ContactSummary> {
        self.contacts.iter().find(|c| &c.id == id)
    }

    pub fn get_mut(&mut self, id: &ConversationId) -> Option<&mut ContactSummary> {
        self.contacts.iter_mut().find(|c| &c.id == id)
    }

    /// Replace the whole directory (initial load) and sort it.
    pub fn replace_all(&mut self, contacts: Vec<ContactSummary>) {
        self.contacts = contacts;
        self.sort();
    }

    /// Sort by `updated_at` descending, missing values last, stable.
    pub fn sort(&mut self) {
        self.contacts
            .sort_by(|a, b| match (a.updated_at, b.updated_at) {
                (Some(a), Some(b)) => b.cmp(&a),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            });
    }

    /// Adopt a poll response: response order first (authoritative), then
    /// any locally held conversations absent from the response appended
    /// afterward, so a narrower page never silently drops contacts.
    pub fn merge_response(&mut self, response: Vec<ContactSummary>) {
        let mut merged = response;
        let leftovers: Vec<ContactSummary> = self
            .contacts
            .drain(..)
            .filter(|local| !merged.iter().any(|r| r.id == local.id))
            .collect();
        merged.extend(leftovers);
        self.contacts = merged;
    }

    /// Append a pagination page, skipping conversations already present.
    /// Page order is preserved; no re-sort is performed here.
    pub fn append_unseen(&mut self, page: Vec<ContactSummary>) -> usize {
        let mut added = 0;
        for summary in page {
            if self.get(&summary.id).is_none() {
                self.contacts.push(summary);
                added += 1;
            }
        }
        added
    }

    /// Insert or replace a single summary, keeping uniqueness by id.
    pub fn upsert(&mut self, summary: ContactSummary) {
        match self.get_mut(&summary.id) {
            Some(existing) => *existing = summary,
            None => self.contacts.push(summary),
        }
    }

    /// Stamp a fresh `updated_at` on a conversation, promoting it on the
    /// next sort. Used when the agent's own reply lands.
    pub fn touch(&mut self, id: &ConversationId, at: DateTime<Utc>) {
        if let Some(summary) = self.get_mut(id) {
            summary.updated_at = Some(at);
            summary.source.updated_at = Some(at.to_rfc3339());
        }
    }

    pub fn clear(&mut self) {
        self.contacts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charla_core::types::{LeadState, RawConversation};

    fn summary(id: &str, updated_at: Option<&str>) -> ContactSummary {
        let raw = RawConversation {
            id: id.to_string(),
            lead_id: None,
            state: LeadState::default(),
            conversation_mode: None,
            updated_at: updated_at.map(String::from),
            asignado_asesor: None,
        };
        crate::format::format_summary(&raw, None)
    }

    fn order(dir: &ContactDirectory) -> Vec<&str> {
        dir.contacts().iter().map(|c| c.id.0.as_str()).collect()
    }

    #[test]
    fn sort_is_descending_with_missing_last() {
        let mut dir = ContactDirectory::new();
        dir.replace_all(vec![
            summary("a", None),
            summary("b", Some("2024-01-02T00:00:00Z")),
            summary("c", Some("2024-01-01T00:00:00Z")),
        ]);
        assert_eq!(order(&dir), vec!["b", "c", "a"]);
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let mut dir = ContactDirectory::new();
        dir.replace_all(vec![
            summary("x", Some("2024-01-01T00:00:00Z")),
            summary("y", Some("2024-01-01T00:00:00Z")),
            summary("z", None),
            summary("w", None),
        ]);
        assert_eq!(order(&dir), vec!["x", "y", "z", "w"]);
    }

    #[test]
    fn merge_keeps_response_order_then_local_leftovers() {
        let mut dir = ContactDirectory::new();
        dir.replace_all(vec![
            summary("old", Some("2024-01-03T00:00:00Z")),
            summary("c1", Some("2024-01-02T00:00:00Z")),
        ]);

        dir.merge_response(vec![
            summary("c1", Some("2024-01-05T00:00:00Z")),
            summary("c2", Some("2024-01-04T00:00:00Z")),
        ]);

        assert_eq!(order(&dir), vec!["c1", "c2", "old"]);
    }

    #[test]
    fn append_unseen_skips_known_ids() {
        let mut dir = ContactDirectory::new();
        dir.replace_all(vec![summary("c1", None)]);

        let added = dir.append_unseen(vec![summary("c1", None), summary("c2", None)]);
        assert_eq!(added, 1);
        assert_eq!(order(&dir), vec!["c1", "c2"]);
    }

    #[test]
    fn touch_promotes_on_next_sort() {
        let mut dir = ContactDirectory::new();
        dir.replace_all(vec![
            summary("c1", Some("2024-01-02T00:00:00Z")),
            summary("c2", Some("2024-01-01T00:00:00Z")),
        ]);

        dir.touch(&ConversationId("c2".into()), Utc::now());
        dir.sort();
        assert_eq!(order(&dir), vec!["c2", "c1"]);
    }
}
