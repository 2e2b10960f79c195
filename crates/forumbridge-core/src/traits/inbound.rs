// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Receiver of content-created notifications from the destination platform.

use async_trait::async_trait;

use crate::types::{ContentEvent, EventOutcome};

/// Handles validated inbound events. Never fails: problems are reported as
/// an ignored outcome.
#[async_trait]
pub trait ContentEventHandler: Send + Sync {
    async fn on_content_created(&self, event: &ContentEvent) -> EventOutcome;
}
