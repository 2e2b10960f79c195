// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resilience primitives for forumbridge remote calls.
//!
//! [`RetryPolicy`] is injected into both platform adapters and retries a
//! single remote call on transient failures with exponential backoff.

pub mod retry;

pub use retry::RetryPolicy;
