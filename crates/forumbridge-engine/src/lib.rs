// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Synchronization and identity-mapping engine for forumbridge.
//!
//! The [`SyncEngine`] is the central coordinator that:
//! - Classifies origin spaces as GROUP or DIRECT
//! - Resolves origin participants to destination users
//! - Creates categories, topics, posts, DM channels and chat messages
//! - Records every mapping before the next dependent write
//! - Relays destination content back to the origin without cycles

pub mod classifier;
pub mod content;
pub mod coordinator;
pub mod identity;
pub mod inbound;
pub mod locks;
pub mod shutdown;

pub use classifier::classify;
pub use coordinator::{EngineSettings, PassReport, SpaceFailure, SpaceReport, SyncEngine};
pub use identity::{IdentityResolver, derive_handle};
pub use locks::KeyedLocks;
pub use shutdown::install_signal_handler;
