// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the forumbridge sync engine.
//!
//! This crate provides the error taxonomy, the domain types for both
//! platforms, and the adapter traits the engine is written against.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{FailureScope, SyncError};
pub use types::{
    ActingIdentity, AdapterType, CategoryRequest, Container, ContentEvent, CreatedTopic,
    DestinationUser, EventOutcome, HealthStatus, IgnoreReason, MappingKind, MappingRecord,
    Message, NewUser, Participant, Space, SpaceKind, Thread, UserRecord,
};

pub use traits::{
    ContentEventHandler, DestinationWriter, MappingStore, OriginWriter, PluginAdapter, SourceReader,
};
