// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content rendering and batch bookkeeping shared by both sync paths.

use chrono::{DateTime, Utc};
use forumbridge_core::Message;

/// Maximum topic title length on the destination.
pub const MAX_TITLE_CHARS: usize = 255;

const TITLE_ELLIPSIS: &str = "...";

/// Topic title: the first non-empty line of `text`, truncated with `...`.
pub fn topic_title(text: &str) -> String {
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    if line.chars().count() <= MAX_TITLE_CHARS {
        return line.to_string();
    }
    let keep = MAX_TITLE_CHARS - TITLE_ELLIPSIS.len();
    let mut title: String = line.chars().take(keep).collect();
    title.push_str(TITLE_ELLIPSIS);
    title
}

/// Opening post body: the title, a blank line, then the full text.
pub fn topic_body(title: &str, text: &str) -> String {
    format!("{title}\n\n{text}")
}

/// Prefixes content posted on behalf of an automated account.
pub fn attributed(display_name: &str, text: &str) -> String {
    format!("**{display_name}**: {text}")
}

/// Sorts messages ascending by (created-at, origin ID).
pub fn sort_messages(messages: &mut [Message]) {
    messages.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Tracks which fetched messages were processed so the cursor only moves
/// past a timestamp once everything at or before it succeeded.
#[derive(Debug, Default, Clone)]
pub struct BatchProgress {
    latest_ok: Option<DateTime<Utc>>,
    earliest_failed: Option<DateTime<Utc>>,
    succeeded: Vec<DateTime<Utc>>,
}

impl BatchProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeeded(&mut self, at: DateTime<Utc>) {
        self.latest_ok = self.latest_ok.max(Some(at));
        self.succeeded.push(at);
    }

    /// Records a message that failed or was never attempted.
    pub fn failed(&mut self, at: DateTime<Utc>) {
        self.earliest_failed = Some(match self.earliest_failed {
            Some(prev) => prev.min(at),
            None => at,
        });
    }

    pub fn failed_all<'a>(&mut self, messages: impl IntoIterator<Item = &'a Message>) {
        for message in messages {
            self.failed(message.created_at);
        }
    }

    /// The greatest timestamp `T` such that every recorded message at or
    /// before `T` succeeded, or `None` if no such timestamp exists.
    pub fn safe_cursor(&self) -> Option<DateTime<Utc>> {
        match self.earliest_failed {
            None => self.latest_ok,
            Some(failed_at) => self
                .succeeded
                .iter()
                .copied()
                .filter(|t| *t < failed_at)
                .max(),
        }
    }
}
