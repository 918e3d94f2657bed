// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation synchronization engine for the Charla console.
//!
//! Keeps a local view of many WhatsApp lead conversations consistent
//! with a remote store mutated by three independent actors (bot, human
//! agent, customer) without a push channel: tiered polling with
//! inactivity suspension, a deduplicating message cache, an ordered
//! contact directory, a mode registry, and a notification ledger.

pub mod cache;
pub mod directory;
pub mod engine;
pub mod format;
pub mod modes;
pub mod notifications;
pub mod poller;

pub use cache::{CacheStats, MessageCache};
pub use directory::ContactDirectory;
pub use engine::{EngineEvent, EngineStats, LoadedMessages, PollScope, SyncEngine};
pub use modes::ConversationModeRegistry;
pub use notifications::{Notification, NotificationKind, NotificationLedger};
pub use poller::{ActivityOutcome, Poller, TickOutcome};
