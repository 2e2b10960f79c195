// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for forumbridge integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockSource`] - In-memory origin platform (reader and writer)
//! - [`MockDestination`] - In-memory destination forum with failure injection
//! - [`FlakyStore`] - Mapping store that can lose topic writes
//! - [`TestHarness`] - A complete engine over the mocks and a temp SQLite store

pub mod fixtures;
pub mod flaky_store;
pub mod harness;
pub mod mock_destination;
pub mod mock_source;

pub use fixtures::{Failure, bot, human, message_at, temp_store, ts};
pub use flaky_store::FlakyStore;
pub use harness::TestHarness;
pub use mock_destination::{
    DestinationOp, MockCategory, MockChannel, MockChatMessage, MockDestination, MockPost,
    MockTopic,
};
pub use mock_source::MockSource;
