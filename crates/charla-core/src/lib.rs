// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Charla console.
//!
//! Provides the shared error type, the wire and display types, and the
//! [`ChatBackend`] seam the sync engine talks through. Every other crate
//! in the workspace builds on this one.

pub mod error;
pub mod traits;
pub mod types;

pub use error::CharlaError;
pub use traits::ChatBackend;
pub use types::{
    ContactPage, ContactSummary, ConversationId, ConversationMode, ConversationSnapshot, Message,
    MessageId, RawConversation, RawMessage, Sender,
};
