// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound webhook gateway.
//!
//! Receives Discourse webhook deliveries, validates them into
//! [`ContentEvent`](forumbridge_core::ContentEvent)s, and hands them to a
//! [`ContentEventHandler`](forumbridge_core::ContentEventHandler). The
//! gateway does not know about the engine; the binary wires the two.

pub mod auth;
pub mod handlers;
pub mod payload;
pub mod server;

#[cfg(test)]
mod testing;

pub use auth::WebhookAuth;
pub use payload::{Delivery, parse_delivery};
pub use server::{GatewayState, HealthState, ServerConfig, router, start_server};
