// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Charla console.

use thiserror::Error;

/// The primary error type used across all Charla crates.
///
/// Every collaborator call and engine operation returns
/// `Result<T, CharlaError>`; nothing throws across a public boundary.
#[derive(Debug, Error)]
pub enum CharlaError {
    /// Configuration errors (invalid TOML, missing endpoint, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// The backend rejected our credential. This is a structural signal,
    /// not a retryable error: pollers observing it stop outright.
    ///
    /// The display string is the exact sentinel the backend emits.
    #[error("Token expirado")]
    ExpiredToken,

    /// Transient backend errors (network failure, 5xx, malformed body).
    #[error("backend error: {message}")]
    Backend {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Input rejected locally before any network call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The conversation is in the terminal-failure set; the load was
    /// short-circuited without a network call. Cleared by a forced refresh.
    #[error("Conversación {0} no disponible")]
    PreviouslyFailed(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CharlaError {
    /// Whether this error is the expired-credential sentinel.
    pub fn is_expired_token(&self) -> bool {
        matches!(self, CharlaError::ExpiredToken)
    }

    /// Whether this error marks a short-circuited, previously failed load.
    pub fn is_previously_failed(&self) -> bool {
        matches!(self, CharlaError::PreviouslyFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_token_displays_the_backend_sentinel() {
        assert_eq!(CharlaError::ExpiredToken.to_string(), "Token expirado");
        assert!(CharlaError::ExpiredToken.is_expired_token());
    }

    #[test]
    fn previously_failed_carries_the_conversation_id() {
        let err = CharlaError::PreviouslyFailed("5215550001".into());
        assert!(err.is_previously_failed());
        assert!(err.to_string().contains("5215550001"));
    }

    #[test]
    fn backend_errors_are_not_structural() {
        let err = CharlaError::Backend {
            message: "HTTP 503".into(),
            source: None,
        };
        assert!(!err.is_expired_token());
        assert!(!err.is_previously_failed());
    }
}
