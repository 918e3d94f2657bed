// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test utilities for Charla crates.
//!
//! Provides a scripted [`MockBackend`] implementing `ChatBackend` with
//! injectable responses and recorded calls for assertion in tests.

pub mod mock_backend;

pub use mock_backend::MockBackend;
