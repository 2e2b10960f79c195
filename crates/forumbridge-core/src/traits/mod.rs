// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod destination;
pub mod inbound;
pub mod source;
pub mod store;

pub use adapter::PluginAdapter;
pub use destination::DestinationWriter;
pub use inbound::ContentEventHandler;
pub use source::{OriginWriter, SourceReader};
pub use store::MappingStore;
