// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP implementation of the Charla chat backend.
//!
//! Thin wrappers around the six fixed REST endpoints, translating HTTP
//! failures into the `CharlaError` taxonomy: 401 is the structural
//! expired-credential signal, everything else non-2xx is transient.

pub mod client;

pub use client::HttpBackend;
