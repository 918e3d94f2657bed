// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock backend for deterministic engine testing.
//!
//! `MockBackend` implements `ChatBackend` with scripted response queues
//! and captured calls for assertion in tests. Unscripted calls return
//! empty successes, so tests only script what they care about.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use charla_core::error::CharlaError;
use charla_core::traits::backend::ChatBackend;
use charla_core::types::{
    ContactPage, ConversationId, ConversationMode, ConversationSnapshot, MessageId, RawMessage,
};

/// A scripted remote store for testing.
///
/// Each operation pops the next scripted response from its queue, or
/// returns an empty success when the queue is exhausted. Every call is
/// recorded with its arguments so tests can assert on call counts and
/// order (e.g. "zero fetches were made" for cache-first behavior).
pub struct MockBackend {
    recent_contacts: Arc<Mutex<VecDeque<Result<ContactPage, CharlaError>>>>,
    next_contacts: Arc<Mutex<VecDeque<Result<ContactPage, CharlaError>>>>,
    conversations: Arc<Mutex<VecDeque<Result<ConversationSnapshot, CharlaError>>>>,
    recent_messages: Arc<Mutex<VecDeque<Result<ConversationSnapshot, CharlaError>>>>,
    mode_acks: Arc<Mutex<VecDeque<Result<(), CharlaError>>>>,
    send_acks: Arc<Mutex<VecDeque<Result<(), CharlaError>>>>,

    recent_contact_calls: Arc<Mutex<usize>>,
    next_contact_calls: Arc<Mutex<Vec<Vec<ConversationId>>>>,
    conversation_calls: Arc<Mutex<Vec<ConversationId>>>,
    delta_calls: Arc<Mutex<Vec<(ConversationId, Option<MessageId>)>>>,
    mode_calls: Arc<Mutex<Vec<(ConversationId, ConversationMode)>>>,
    sent_messages: Arc<Mutex<Vec<(ConversationId, String)>>>,
}

impl MockBackend {
    /// Create a new mock with empty scripts (every call succeeds empty).
    pub fn new() -> Self {
        Self {
            recent_contacts: Arc::new(Mutex::new(VecDeque::new())),
            next_contacts: Arc::new(Mutex::new(VecDeque::new())),
            conversations: Arc::new(Mutex::new(VecDeque::new())),
            recent_messages: Arc::new(Mutex::new(VecDeque::new())),
            mode_acks: Arc::new(Mutex::new(VecDeque::new())),
            send_acks: Arc::new(Mutex::new(VecDeque::new())),
            recent_contact_calls: Arc::new(Mutex::new(0)),
            next_contact_calls: Arc::new(Mutex::new(Vec::new())),
            conversation_calls: Arc::new(Mutex::new(Vec::new())),
            delta_calls: Arc::new(Mutex::new(Vec::new())),
            mode_calls: Arc::new(Mutex::new(Vec::new())),
            sent_messages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Script the next response for `fetch_recent_contacts`.
    pub async fn script_recent_contacts(&self, result: Result<ContactPage, CharlaError>) {
        self.recent_contacts.lock().await.push_back(result);
    }

    /// Script the next response for `fetch_next_contacts`.
    pub async fn script_next_contacts(&self, result: Result<ContactPage, CharlaError>) {
        self.next_contacts.lock().await.push_back(result);
    }

    /// Script the next response for `fetch_conversation`.
    pub async fn script_conversation(&self, result: Result<ConversationSnapshot, CharlaError>) {
        self.conversations.lock().await.push_back(result);
    }

    /// Script the next response for `fetch_recent_messages`.
    pub async fn script_recent_messages(&self, result: Result<ConversationSnapshot, CharlaError>) {
        self.recent_messages.lock().await.push_back(result);
    }

    /// Script the next ack for `set_conversation_mode`.
    pub async fn script_mode_ack(&self, result: Result<(), CharlaError>) {
        self.mode_acks.lock().await.push_back(result);
    }

    /// Script the next ack for `send_agent_message`.
    pub async fn script_send_ack(&self, result: Result<(), CharlaError>) {
        self.send_acks.lock().await.push_back(result);
    }

    /// How many times `fetch_recent_contacts` was called.
    pub async fn recent_contact_calls(&self) -> usize {
        *self.recent_contact_calls.lock().await
    }

    /// The known-id cursors passed to `fetch_next_contacts`.
    pub async fn next_contact_calls(&self) -> Vec<Vec<ConversationId>> {
        self.next_contact_calls.lock().await.clone()
    }

    /// The conversation ids passed to `fetch_conversation`.
    pub async fn conversation_calls(&self) -> Vec<ConversationId> {
        self.conversation_calls.lock().await.clone()
    }

    /// The (conversation, last-message-id) pairs passed to
    /// `fetch_recent_messages`.
    pub async fn delta_calls(&self) -> Vec<(ConversationId, Option<MessageId>)> {
        self.delta_calls.lock().await.clone()
    }

    /// The mode changes requested through `set_conversation_mode`.
    pub async fn mode_calls(&self) -> Vec<(ConversationId, ConversationMode)> {
        self.mode_calls.lock().await.clone()
    }

    /// The agent replies passed to `send_agent_message`.
    pub async fn sent_messages(&self) -> Vec<(ConversationId, String)> {
        self.sent_messages.lock().await.clone()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a raw message with a generated id, for snapshot scripting.
pub fn raw_message(text: &str, sender: &str, timestamp: &str) -> RawMessage {
    RawMessage {
        id: format!("wamid.{}", uuid::Uuid::new_v4()),
        text: Some(text.to_string()),
        sender: sender.to_string(),
        timestamp: timestamp.to_string(),
        multimedia: None,
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn fetch_recent_contacts(&self) -> Result<ContactPage, CharlaError> {
        *self.recent_contact_calls.lock().await += 1;
        self.recent_contacts
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(ContactPage::default()))
    }

    async fn fetch_next_contacts(
        &self,
        known: &[ConversationId],
    ) -> Result<ContactPage, CharlaError> {
        self.next_contact_calls.lock().await.push(known.to_vec());
        self.next_contacts
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(ContactPage::default()))
    }

    async fn fetch_conversation(
        &self,
        conversation: &ConversationId,
    ) -> Result<ConversationSnapshot, CharlaError> {
        self.conversation_calls.lock().await.push(conversation.clone());
        self.conversations
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(ConversationSnapshot::default()))
    }

    async fn fetch_recent_messages(
        &self,
        conversation: &ConversationId,
        last_message: Option<&MessageId>,
    ) -> Result<ConversationSnapshot, CharlaError> {
        self.delta_calls
            .lock()
            .await
            .push((conversation.clone(), last_message.cloned()));
        self.recent_messages
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(ConversationSnapshot::default()))
    }

    async fn set_conversation_mode(
        &self,
        conversation: &ConversationId,
        mode: ConversationMode,
    ) -> Result<(), CharlaError> {
        self.mode_calls.lock().await.push((conversation.clone(), mode));
        self.mode_acks.lock().await.pop_front().unwrap_or(Ok(()))
    }

    async fn send_agent_message(
        &self,
        conversation: &ConversationId,
        text: &str,
    ) -> Result<(), CharlaError> {
        self.sent_messages
            .lock()
            .await
            .push((conversation.clone(), text.to_string()));
        self.send_acks.lock().await.pop_front().unwrap_or(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unscripted_calls_return_empty_successes() {
        let backend = MockBackend::new();
        let page = backend.fetch_recent_contacts().await.unwrap();
        assert!(page.conversations.is_empty());
        assert!(!page.has_more);

        let snapshot = backend
            .fetch_conversation(&ConversationId("5215550001".into()))
            .await
            .unwrap();
        assert!(snapshot.messages.is_empty());
    }

    #[tokio::test]
    async fn scripted_responses_pop_in_order() {
        let backend = MockBackend::new();
        backend
            .script_recent_messages(Err(CharlaError::ExpiredToken))
            .await;
        backend
            .script_recent_messages(Ok(ConversationSnapshot::default()))
            .await;

        let conv = ConversationId("5215550001".into());
        let first = backend.fetch_recent_messages(&conv, None).await;
        assert!(first.unwrap_err().is_expired_token());
        assert!(backend.fetch_recent_messages(&conv, None).await.is_ok());

        let calls = backend.delta_calls().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, conv);
    }

    #[tokio::test]
    async fn mode_and_send_calls_are_recorded() {
        let backend = MockBackend::new();
        let conv = ConversationId("5215550001".into());
        backend
            .set_conversation_mode(&conv, ConversationMode::Agent)
            .await
            .unwrap();
        backend.send_agent_message(&conv, "hola").await.unwrap();

        assert_eq!(backend.mode_calls().await, vec![(conv.clone(), ConversationMode::Agent)]);
        assert_eq!(backend.sent_messages().await, vec![(conv, "hola".to_string())]);
    }
}
