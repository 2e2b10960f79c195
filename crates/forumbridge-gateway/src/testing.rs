// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Mutex;

use async_trait::async_trait;
use forumbridge_core::{ContentEvent, ContentEventHandler, EventOutcome};

/// Records every event and answers with a fixed outcome.
pub(crate) struct RecordingHandler {
    pub events: Mutex<Vec<ContentEvent>>,
    pub outcome: EventOutcome,
}

impl Default for RecordingHandler {
    fn default() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            outcome: EventOutcome::Accepted {
                origin_message_id: "spaces/AAA/messages/m1".into(),
            },
        }
    }
}

impl RecordingHandler {
    pub fn answering(outcome: EventOutcome) -> Self {
        Self {
            outcome,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<ContentEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentEventHandler for RecordingHandler {
    async fn on_content_created(&self, event: &ContentEvent) -> EventOutcome {
        self.events.lock().unwrap().push(event.clone());
        self.outcome.clone()
    }
}
