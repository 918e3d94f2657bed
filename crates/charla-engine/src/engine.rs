// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversation synchronization engine.
//!
//! `SyncEngine` keeps a local view of many conversations consistent with
//! a remote store mutated by the bot, the operator, and the customer,
//! without a push channel: tiered polling, caching with deduplication,
//! inactivity suspension, and notification surfacing. All shared state
//! lives behind one async mutex and every mutation is a read-modify-write
//! against the current value, never a stale captured copy.

use std::sync::{Arc, Weak};

use chrono::Utc;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use charla_config::CharlaConfig;
use charla_core::error::CharlaError;
use charla_core::traits::backend::ChatBackend;
use charla_core::types::{
    ContactSummary, ConversationId, ConversationMode, ConversationSnapshot, LeadInfo, Message,
    RawConversation, RawMessage,
};

use crate::cache::MessageCache;
use crate::directory::ContactDirectory;
use crate::format;
use crate::modes::ConversationModeRegistry;
use crate::notifications::{NotificationKind, NotificationLedger};
use crate::poller::{ActivityOutcome, Poller, TickOutcome};

/// Which timer family an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollScope {
    Messages,
    Contacts,
}

/// Engine events a UI subscribes to so it can re-render without owning
/// timers. Delivery is best-effort; lagging receivers drop events.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    MessagesAppended {
        conversation: ConversationId,
        count: usize,
    },
    DirectoryChanged,
    ContactNotification {
        conversation: ConversationId,
        kind: NotificationKind,
    },
    ModeChanged {
        conversation: ConversationId,
        mode: ConversationMode,
    },
    PollingHalted {
        scope: PollScope,
    },
}

/// Result of a load-or-fetch, with the provenance the UI cares about.
#[derive(Debug, Clone)]
pub struct LoadedMessages {
    pub messages: Vec<Message>,
    pub mode: ConversationMode,
    pub lead_info: Option<LeadInfo>,
    pub completed: bool,
    /// True when served from the cache with no network call.
    pub from_cache: bool,
}

/// Counters reported by [`SyncEngine::debug_stats`].
#[derive(Debug, Clone)]
pub struct EngineStats {
    pub cached_conversations: usize,
    pub failed_conversations: usize,
    pub contacts: usize,
    pub pending_notifications: usize,
    pub active: Option<ConversationId>,
    pub message_polling: bool,
    pub contact_polling: bool,
}

struct EngineState {
    cache: MessageCache,
    directory: ContactDirectory,
    modes: ConversationModeRegistry,
    notifications: NotificationLedger,
    active: Option<ConversationId>,
    has_more_contacts: bool,
}

struct EngineInner {
    backend: Arc<dyn ChatBackend>,
    config: CharlaConfig,
    state: Mutex<EngineState>,
    message_poller: Poller,
    contact_poller: Poller,
    events: broadcast::Sender<EngineEvent>,
}

/// The orchestrator: conversation selection, initial load, delta
/// polling, directory polling, mode changes, and teardown.
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

impl SyncEngine {
    pub fn new(backend: Arc<dyn ChatBackend>, config: CharlaConfig) -> Self {
        let polling = &config.polling;
        let message_poller = Poller::new(
            "messages",
            polling.message_interval(),
            polling.message_idle_timeout(),
        );
        let contact_poller = Poller::new(
            "contacts",
            polling.contact_interval(),
            polling.contact_idle_timeout(),
        );
        let (events, _) = broadcast::channel(64);

        Self {
            inner: Arc::new(EngineInner {
                backend,
                config,
                state: Mutex::new(EngineState {
                    cache: MessageCache::new(),
                    directory: ContactDirectory::new(),
                    modes: ConversationModeRegistry::new(),
                    notifications: NotificationLedger::new(),
                    active: None,
                    has_more_contacts: false,
                }),
                message_poller,
                contact_poller,
                events,
            }),
        }
    }

    /// Subscribe to engine events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.inner.events.subscribe()
    }

    /// Load the first directory page and start contact-level polling.
    pub async fn load_recent_contacts(&self) -> Result<Vec<ContactSummary>, CharlaError> {
        let page = self.inner.backend.fetch_recent_contacts().await?;

        let contacts = {
            let mut state = self.inner.state.lock().await;
            let summaries = page
                .conversations
                .iter()
                .map(|raw| EngineInner::summarize(&state, raw))
                .collect();
            EngineInner::adopt_modes(&mut state, &page.conversations);
            state.directory.replace_all(summaries);
            state.has_more_contacts = page.has_more;
            state.directory.contacts().to_vec()
        };

        info!(contacts = contacts.len(), has_more = page.has_more, "directory loaded");
        self.inner.emit(EngineEvent::DirectoryChanged);
        EngineInner::start_contact_polling(&self.inner);
        Ok(contacts)
    }

    /// Fetch the next directory page after the currently known ids.
    /// Counts as user activity. Returns whether more pages remain.
    pub async fn load_next_contacts(&self) -> Result<bool, CharlaError> {
        let known = {
            let state = self.inner.state.lock().await;
            state.directory.ids()
        };
        let page = self.inner.backend.fetch_next_contacts(&known).await?;

        let added = {
            let mut state = self.inner.state.lock().await;
            let summaries: Vec<ContactSummary> = page
                .conversations
                .iter()
                .map(|raw| EngineInner::summarize(&state, raw))
                .collect();
            EngineInner::adopt_modes(&mut state, &page.conversations);
            state.has_more_contacts = page.has_more;
            state.directory.append_unseen(summaries)
        };

        debug!(added, has_more = page.has_more, "directory page appended");
        if added > 0 {
            self.inner.emit(EngineEvent::DirectoryChanged);
        }
        self.mark_activity().await;
        Ok(page.has_more)
    }

    /// Make a conversation the active selection.
    ///
    /// Seeds the mode registry from the known summary on first sight,
    /// loads or delta-refreshes its messages, starts message-level
    /// polling, and consumes any pending notification for it.
    pub async fn activate(
        &self,
        conversation: &ConversationId,
        known_summary: Option<&ContactSummary>,
    ) -> Result<(), CharlaError> {
        if conversation.0.trim().is_empty() {
            return Err(CharlaError::InvalidInput(
                "conversation id must not be blank".into(),
            ));
        }

        let (cached, failed) = {
            let mut state = self.inner.state.lock().await;
            state.active = Some(conversation.clone());
            if let Some(summary) = known_summary {
                state.modes.seed_if_absent(conversation.clone(), summary.mode);
            }
            if state.notifications.take(conversation).is_some() {
                debug!(%conversation, "notification acknowledged by selection");
            }
            (state.cache.is_cached(conversation), state.cache.is_failed(conversation))
        };

        if cached {
            // Close the gap between the last poll and now with one
            // immediate delta check, same mechanism as a poll tick.
            EngineInner::poll_active_once(&self.inner).await;
        } else if !failed {
            if let Err(err) = self.load_messages(conversation, false).await {
                warn!(%conversation, error = %err, "initial load failed");
            }
        }
        // A failure mark present: poll anyway, a later tick may succeed.

        EngineInner::start_message_polling(&self.inner);
        Ok(())
    }

    /// Clear the active selection and stop message-level polling.
    ///
    /// The contact-level family is untouched: the directory keeps
    /// refreshing while no conversation is open. Cached messages stay
    /// put for a later reactivation.
    pub async fn deactivate(&self) {
        let mut state = self.inner.state.lock().await;
        state.active = None;
        drop(state);

        self.inner.message_poller.stop();
        debug!("active selection cleared, message polling stopped");
    }

    /// Load a conversation's messages, serving from the cache when
    /// possible and short-circuiting known-bad ids unless forced.
    pub async fn load_messages(
        &self,
        conversation: &ConversationId,
        force_refresh: bool,
    ) -> Result<LoadedMessages, CharlaError> {
        if conversation.0.trim().is_empty() {
            return Err(CharlaError::InvalidInput(
                "conversation id must not be blank".into(),
            ));
        }

        {
            let mut state = self.inner.state.lock().await;
            if !force_refresh {
                if state.cache.is_failed(conversation) {
                    return Err(CharlaError::PreviouslyFailed(conversation.0.clone()));
                }
                if state.cache.is_cached(conversation) {
                    debug!(%conversation, "messages served from cache");
                    return Ok(EngineInner::loaded_from_state(&state, conversation, true));
                }
            } else {
                state.cache.clear_failure(conversation);
            }
        }

        match self.inner.backend.fetch_conversation(conversation).await {
            Ok(snapshot) => {
                let mut state = self.inner.state.lock().await;
                let formatted: Vec<Message> =
                    snapshot.messages.iter().map(format::format_message).collect();
                state.cache.insert(conversation.clone(), formatted);
                EngineInner::adopt_snapshot(&mut state, conversation, &snapshot);
                info!(%conversation, messages = snapshot.messages.len(), "conversation loaded");
                self.inner.emit(EngineEvent::DirectoryChanged);
                Ok(EngineInner::loaded_from_state(&state, conversation, false))
            }
            Err(err) => {
                let mut state = self.inner.state.lock().await;
                state.cache.mark_failed(conversation.clone());
                warn!(%conversation, error = %err, "conversation load failed, marked");
                Err(err)
            }
        }
    }

    /// Run one message-level delta check immediately, outside the timer.
    pub async fn refresh_active(&self) {
        EngineInner::poll_active_once(&self.inner).await;
    }

    /// Run one contact-level directory poll immediately, outside the timer.
    pub async fn refresh_contacts(&self) {
        EngineInner::poll_contacts_once(&self.inner).await;
    }

    /// Switch a conversation between bot and agent control.
    ///
    /// The registry is written only after the backend acknowledges the
    /// mutation; on failure the error passes through unmodified and no
    /// local state changes.
    pub async fn set_mode(
        &self,
        conversation: &ConversationId,
        mode: ConversationMode,
    ) -> Result<(), CharlaError> {
        if conversation.0.trim().is_empty() {
            return Err(CharlaError::InvalidInput(
                "conversation id must not be blank".into(),
            ));
        }

        self.inner
            .backend
            .set_conversation_mode(conversation, mode)
            .await?;

        {
            let mut state = self.inner.state.lock().await;
            state.modes.set(conversation.clone(), mode);
            if let Some(summary) = state.directory.get_mut(conversation) {
                summary.mode = mode;
                summary.source.conversation_mode = Some(mode.to_string());
            }
        }
        info!(%conversation, %mode, "conversation mode changed");
        self.inner.emit(EngineEvent::ModeChanged {
            conversation: conversation.clone(),
            mode,
        });
        Ok(())
    }

    /// Send a human-agent reply. On acknowledgment the message is
    /// appended locally; no round trip re-fetches what the UI already
    /// has authoritatively.
    pub async fn send_agent_message(
        &self,
        conversation: &ConversationId,
        text: &str,
    ) -> Result<(), CharlaError> {
        if conversation.0.trim().is_empty() {
            return Err(CharlaError::InvalidInput(
                "conversation id must not be blank".into(),
            ));
        }
        if text.trim().is_empty() {
            return Err(CharlaError::InvalidInput("message must not be empty".into()));
        }

        self.inner
            .backend
            .send_agent_message(conversation, text)
            .await?;

        let raw = RawMessage {
            id: format!("local.{}", uuid::Uuid::new_v4()),
            text: Some(text.to_string()),
            sender: format!("asesor_{}", self.inner.config.console.operator),
            timestamp: Utc::now().to_rfc3339(),
            multimedia: None,
        };
        self.append_local(conversation, raw).await;
        self.mark_activity().await;
        Ok(())
    }

    /// Append an already-acknowledged outbound message into the cache.
    ///
    /// An agent-sent message also stamps a fresh `updated_at` on the
    /// owning summary and re-sorts, promoting the conversation without
    /// waiting for the next poll.
    pub async fn append_local(&self, conversation: &ConversationId, raw: RawMessage) {
        let message = format::format_message(&raw);
        let from_agent = message.sender == charla_core::types::Sender::HumanAgent;

        let appended = {
            let mut state = self.inner.state.lock().await;
            let appended = state.cache.append_message(conversation, message);
            if appended {
                EngineInner::refresh_preview(&mut state, conversation);
                if from_agent {
                    state.directory.touch(conversation, Utc::now());
                    state.directory.sort();
                }
            }
            appended
        };

        if appended {
            self.inner.emit(EngineEvent::MessagesAppended {
                conversation: conversation.clone(),
                count: 1,
            });
            if from_agent {
                self.inner.emit(EngineEvent::DirectoryChanged);
            }
        }
    }

    /// Signal user activity: re-arms live timers, restarts suspended
    /// ones. A family that was never started stays down, as does a
    /// structurally halted one; only an explicit reactivation after a
    /// fresh credential revives the latter.
    pub async fn mark_activity(&self) {
        match self.inner.message_poller.mark_activity() {
            ActivityOutcome::Rearmed | ActivityOutcome::NeverStarted => {}
            ActivityOutcome::NeedsRestart => {
                let has_active = self.inner.state.lock().await.active.is_some();
                if has_active {
                    debug!("restarting message polling on activity");
                    EngineInner::start_message_polling(&self.inner);
                }
            }
            ActivityOutcome::Halted => {
                debug!("message polling halted; activity ignored");
            }
        }

        match self.inner.contact_poller.mark_activity() {
            ActivityOutcome::Rearmed | ActivityOutcome::NeverStarted => {}
            ActivityOutcome::NeedsRestart => {
                debug!("restarting contact polling on activity");
                EngineInner::start_contact_polling(&self.inner);
            }
            ActivityOutcome::Halted => {
                debug!("contact polling halted; activity ignored");
            }
        }
    }

    /// Tear down everything: cancel both timers and wipe all state.
    /// Used on logout; safe to call repeatedly.
    pub async fn clear_all(&self) {
        self.inner.message_poller.stop();
        self.inner.contact_poller.stop();

        let mut state = self.inner.state.lock().await;
        state.cache.clear();
        state.directory.clear();
        state.modes.clear();
        state.notifications.clear();
        state.active = None;
        state.has_more_contacts = false;
        drop(state);

        info!("engine state cleared");
        self.inner.emit(EngineEvent::DirectoryChanged);
    }

    /// The cached messages for a conversation.
    pub async fn messages(&self, conversation: &ConversationId) -> Vec<Message> {
        let state = self.inner.state.lock().await;
        state.cache.get(conversation).map(<[Message]>::to_vec).unwrap_or_default()
    }

    /// The current directory, in display order.
    pub async fn contacts(&self) -> Vec<ContactSummary> {
        let state = self.inner.state.lock().await;
        state.directory.contacts().to_vec()
    }

    /// The current mode for a conversation (default bot).
    pub async fn mode(&self, conversation: &ConversationId) -> ConversationMode {
        let state = self.inner.state.lock().await;
        state.modes.get(conversation)
    }

    /// The active selection, if any.
    pub async fn active(&self) -> Option<ConversationId> {
        self.inner.state.lock().await.active.clone()
    }

    /// Whether more directory pages remain beyond the loaded ones.
    pub async fn has_more_contacts(&self) -> bool {
        self.inner.state.lock().await.has_more_contacts
    }

    /// Peek at the pending notification for a conversation.
    pub async fn pending_notification(
        &self,
        conversation: &ConversationId,
    ) -> Option<crate::notifications::Notification> {
        self.inner.state.lock().await.notifications.get(conversation)
    }

    /// Diagnostic counters for the status line.
    pub async fn debug_stats(&self) -> EngineStats {
        let state = self.inner.state.lock().await;
        let cache = state.cache.stats();
        EngineStats {
            cached_conversations: cache.cached,
            failed_conversations: cache.failed,
            contacts: state.directory.len(),
            pending_notifications: state.notifications.len(),
            active: state.active.clone(),
            message_polling: self.inner.message_poller.is_running(),
            contact_polling: self.inner.contact_poller.is_running(),
        }
    }
}

impl EngineInner {
    fn emit(&self, event: EngineEvent) {
        // Best-effort: no subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Build a summary for a raw record, deriving the preview from the
    /// newest cached message when the conversation is loaded.
    fn summarize(state: &EngineState, raw: &RawConversation) -> ContactSummary {
        let id = ConversationId(raw.id.clone());
        format::format_summary(raw, state.cache.newest(&id))
    }

    /// Adopt remote-confirmed modes from a contact page.
    fn adopt_modes(state: &mut EngineState, conversations: &[RawConversation]) {
        for raw in conversations {
            if let Some(mode) = raw
                .conversation_mode
                .as_deref()
                .and_then(|m| m.parse::<ConversationMode>().ok())
            {
                state.modes.set(ConversationId(raw.id.clone()), mode);
            }
        }
    }

    /// Fold a conversation snapshot into the owning summary and the mode
    /// registry. Snapshot data is remote-confirmed.
    fn adopt_snapshot(
        state: &mut EngineState,
        conversation: &ConversationId,
        snapshot: &ConversationSnapshot,
    ) {
        if let Some(mode) = snapshot
            .conversation_mode
            .as_deref()
            .and_then(|m| m.parse::<ConversationMode>().ok())
        {
            state.modes.set(conversation.clone(), mode);
        }

        let updated = {
            let newest = state.cache.newest(conversation).cloned();
            state.directory.get_mut(conversation).map(|summary| {
                if let Some(mode_raw) = &snapshot.conversation_mode {
                    summary.source.conversation_mode = Some(mode_raw.clone());
                }
                if let Some(lead_state) = &snapshot.state {
                    summary.source.state = lead_state.clone();
                }
                if let Some(completed) = snapshot.completed {
                    summary.source.state.completed = completed;
                }
                if let Some(updated_at) = &snapshot.updated_at {
                    summary.source.updated_at = Some(updated_at.clone());
                }
                *summary = format::format_summary(&summary.source.clone(), newest.as_ref());
            })
        };

        if updated.is_some() {
            state.directory.sort();
        }
    }

    /// Re-derive a summary's preview from the newest cached message.
    fn refresh_preview(state: &mut EngineState, conversation: &ConversationId) {
        let preview = state.cache.newest(conversation).map(format::message_preview);
        if let (Some(preview), Some(summary)) = (preview, state.directory.get_mut(conversation)) {
            summary.last_message = preview;
        }
    }

    fn loaded_from_state(
        state: &EngineState,
        conversation: &ConversationId,
        from_cache: bool,
    ) -> LoadedMessages {
        let summary = state.directory.get(conversation);
        LoadedMessages {
            messages: state
                .cache
                .get(conversation)
                .map(<[Message]>::to_vec)
                .unwrap_or_default(),
            mode: state.modes.get(conversation),
            lead_info: summary.and_then(|s| s.source.state.lead_info()),
            completed: summary.map(|s| s.completed).unwrap_or(false),
            from_cache,
        }
    }

    fn start_message_polling(inner: &Arc<EngineInner>) {
        let weak: Weak<EngineInner> = Arc::downgrade(inner);
        inner.message_poller.start(move || {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(inner) => EngineInner::poll_active_once(&inner).await,
                    None => TickOutcome::Halt,
                }
            }
        });
    }

    fn start_contact_polling(inner: &Arc<EngineInner>) {
        let weak: Weak<EngineInner> = Arc::downgrade(inner);
        inner.contact_poller.start(move || {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(inner) => EngineInner::poll_contacts_once(&inner).await,
                    None => TickOutcome::Halt,
                }
            }
        });
    }

    /// One message-level delta tick against the active conversation.
    ///
    /// Reads all state at call time; ticks that overlap a slow fetch are
    /// tolerated through id deduplication rather than prevented.
    async fn poll_active_once(inner: &Arc<EngineInner>) -> TickOutcome {
        let (conversation, last_id) = {
            let state = inner.state.lock().await;
            let Some(conversation) = state.active.clone() else {
                return TickOutcome::Continue;
            };
            // Nothing cached yet means nothing to diff against.
            match state.cache.last_message_id(&conversation) {
                Some(last) => (conversation, last.clone()),
                None => return TickOutcome::Continue,
            }
        };

        let result = inner
            .backend
            .fetch_recent_messages(&conversation, Some(&last_id))
            .await;

        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(err) if err.is_expired_token() => {
                warn!(%conversation, "credential expired, halting message polling");
                inner.emit(EngineEvent::PollingHalted {
                    scope: PollScope::Messages,
                });
                return TickOutcome::Halt;
            }
            Err(err) => {
                // Transient; the timer stays alive for the next interval.
                warn!(%conversation, error = %err, "delta fetch failed");
                return TickOutcome::Continue;
            }
        };

        let appended = {
            let mut state = inner.state.lock().await;
            let appended = state.cache.append_raw(&conversation, &snapshot.messages);
            if !appended.is_empty() {
                EngineInner::refresh_preview(&mut state, &conversation);
            }
            EngineInner::adopt_snapshot(&mut state, &conversation, &snapshot);
            appended.len()
        };

        if appended > 0 {
            debug!(%conversation, appended, "delta messages appended");
            inner.emit(EngineEvent::MessagesAppended {
                conversation: conversation.clone(),
                count: appended,
            });
            inner.emit(EngineEvent::DirectoryChanged);
        }
        TickOutcome::Continue
    }

    /// One contact-level directory tick: fetch the recent page, diff it
    /// against the directory, surface notifications, and adopt the
    /// response order.
    async fn poll_contacts_once(inner: &Arc<EngineInner>) -> TickOutcome {
        let page = match inner.backend.fetch_recent_contacts().await {
            Ok(page) => page,
            Err(err) if err.is_expired_token() => {
                warn!("credential expired, halting contact polling");
                inner.emit(EngineEvent::PollingHalted {
                    scope: PollScope::Contacts,
                });
                return TickOutcome::Halt;
            }
            Err(err) => {
                warn!(error = %err, "contact poll failed");
                return TickOutcome::Continue;
            }
        };

        let echo_threshold = chrono::Duration::from_std(inner.config.polling.echo_threshold())
            .unwrap_or_else(|_| chrono::Duration::milliseconds(2000));

        let mut raised = Vec::new();
        {
            let mut state = inner.state.lock().await;
            let now = Utc::now();

            let mut summaries = Vec::with_capacity(page.conversations.len());
            for raw in &page.conversations {
                let incoming = EngineInner::summarize(&state, raw);
                let is_active = state.active.as_ref() == Some(&incoming.id);

                let prior = state.directory.get(&incoming.id).map(|e| e.updated_at);
                match prior {
                    None => {
                        if !is_active {
                            state
                                .notifications
                                .record(incoming.id.clone(), NotificationKind::NewContact, now);
                            raised.push((incoming.id.clone(), NotificationKind::NewContact));
                        }
                    }
                    Some(old_updated) if old_updated != incoming.updated_at => {
                        // Deltas at or below the echo threshold are the
                        // operator's own actions bouncing back; they must
                        // not raise a false badge.
                        let gap = match (old_updated, incoming.updated_at) {
                            (Some(old), Some(new)) => Some((new - old).abs()),
                            _ => None,
                        };
                        let echo = gap.is_some_and(|g| g <= echo_threshold);
                        if !is_active && !echo {
                            state.notifications.record(
                                incoming.id.clone(),
                                NotificationKind::UpdatedContact,
                                now,
                            );
                            raised.push((incoming.id.clone(), NotificationKind::UpdatedContact));
                        }
                    }
                    Some(_) => {}
                }
                summaries.push(incoming);
            }

            EngineInner::adopt_modes(&mut state, &page.conversations);
            state.directory.merge_response(summaries);
            state.has_more_contacts = page.has_more;
        }

        for (conversation, kind) in raised {
            inner.emit(EngineEvent::ContactNotification { conversation, kind });
        }
        inner.emit(EngineEvent::DirectoryChanged);
        TickOutcome::Continue
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        // Timers hold only a weak reference back to the engine, but
        // cancel them eagerly rather than waiting for their next tick.
        self.inner.message_poller.stop();
        self.inner.contact_poller.stop();
    }
}
