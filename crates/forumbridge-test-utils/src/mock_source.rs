// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock origin platform for deterministic testing.
//!
//! `MockSource` implements `SourceReader` and `OriginWriter` over an
//! in-memory list of spaces and messages. Messages written through
//! `OriginWriter` are appended to the same list, so a later read sees them
//! exactly like the real platform would.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use forumbridge_core::{
    AdapterType, Container, HealthStatus, Message, OriginWriter, Participant, PluginAdapter,
    SourceReader, Space, SyncError, Thread,
};

use crate::fixtures::{Failure, ts};

/// Sender of messages the service posts into the origin.
pub const APP_SENDER_ID: &str = "users/app";

#[derive(Default)]
struct SourceState {
    spaces: Vec<Space>,
    messages: Vec<Message>,
    members: HashMap<String, Vec<Participant>>,
    created: Vec<Message>,
    space_failures: HashMap<String, Failure>,
    listing_failures: HashMap<String, Failure>,
    write_failure: Option<Failure>,
    get_space_calls: usize,
    next_id: u64,
}

/// An in-memory origin platform.
#[derive(Default)]
pub struct MockSource {
    state: Mutex<SourceState>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a space with the given origin-reported type.
    pub fn with_space(self, id: &str, display_name: &str, space_type: &str) -> Self {
        self.state().spaces.push(Space {
            id: id.to_string(),
            display_name: display_name.to_string(),
            space_type: space_type.to_string(),
        });
        self
    }

    /// Appends a message as if it had just been posted on the origin.
    pub fn push(&self, message: Message) {
        self.state().messages.push(message);
    }

    pub fn set_members(&self, space_id: &str, members: Vec<Participant>) {
        self.state().members.insert(space_id.to_string(), members);
    }

    /// Removes a space so that it reports `NotFound`.
    pub async fn remove_space(&self, space_id: &str) {
        self.state().spaces.retain(|s| s.id != space_id);
    }

    /// Makes every read touching `space_id` fail until cleared.
    pub async fn fail_space(&self, space_id: &str, failure: Failure) {
        self.state()
            .space_failures
            .insert(space_id.to_string(), failure);
    }

    /// Makes thread and message listings of `space_id` fail while
    /// `get_space` keeps succeeding.
    pub async fn fail_listings(&self, space_id: &str, failure: Failure) {
        self.state()
            .listing_failures
            .insert(space_id.to_string(), failure);
    }

    /// Makes every `create_message` fail until cleared.
    pub async fn fail_writes(&self, failure: Failure) {
        self.state().write_failure = Some(failure);
    }

    pub async fn clear_failures(&self) {
        let mut state = self.state();
        state.space_failures.clear();
        state.listing_failures.clear();
        state.write_failure = None;
    }

    /// Messages written through `OriginWriter`.
    pub async fn created_messages(&self) -> Vec<Message> {
        self.state().created.clone()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.state().messages.clone()
    }

    pub async fn get_space_calls(&self) -> usize {
        self.state().get_space_calls
    }

    fn state(&self) -> MutexGuard<'_, SourceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_space(state: &SourceState, space_id: &str) -> Result<(), SyncError> {
        match state.space_failures.get(space_id) {
            Some(failure) => Err(failure.to_error(space_id)),
            None => Ok(()),
        }
    }

    fn check_listing(state: &SourceState, space_id: &str) -> Result<(), SyncError> {
        Self::check_space(state, space_id)?;
        match state.listing_failures.get(space_id) {
            Some(failure) => Err(failure.to_error(space_id)),
            None => Ok(()),
        }
    }
}

fn after(created_at: DateTime<Utc>, since: Option<DateTime<Utc>>) -> bool {
    since.is_none_or(|since| created_at > since)
}

fn sorted(mut messages: Vec<Message>) -> Vec<Message> {
    messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    messages
}

#[async_trait]
impl PluginAdapter for MockSource {
    fn name(&self) -> &str {
        "mock-source"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Source
    }

    async fn health_check(&self) -> Result<HealthStatus, SyncError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SyncError> {
        Ok(())
    }
}

#[async_trait]
impl SourceReader for MockSource {
    async fn list_spaces(&self) -> Result<Vec<Space>, SyncError> {
        Ok(self.state().spaces.clone())
    }

    async fn get_space(&self, space_id: &str) -> Result<Space, SyncError> {
        let mut state = self.state();
        state.get_space_calls += 1;
        Self::check_space(&state, space_id)?;
        state
            .spaces
            .iter()
            .find(|s| s.id == space_id)
            .cloned()
            .ok_or_else(|| SyncError::NotFound {
                resource: space_id.to_string(),
            })
    }

    async fn list_threads(
        &self,
        space_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Thread>, SyncError> {
        let state = self.state();
        Self::check_listing(&state, space_id)?;
        let mut threads: Vec<Thread> = Vec::new();
        let recent = state
            .messages
            .iter()
            .filter(|m| m.space_id == space_id && after(m.created_at, since))
            .cloned()
            .collect();
        for message in sorted(recent) {
            if let Some(thread_id) = message.thread_id
                && !threads.iter().any(|t| t.id == thread_id)
            {
                threads.push(Thread {
                    id: thread_id,
                    space_id: space_id.to_string(),
                });
            }
        }
        Ok(threads)
    }

    async fn list_messages(
        &self,
        container: &Container,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Message>, SyncError> {
        let state = self.state();
        Self::check_listing(&state, container.space_id())?;
        let messages = state
            .messages
            .iter()
            .filter(|m| match container {
                Container::Space(space_id) => &m.space_id == space_id,
                Container::Thread { thread_id, .. } => {
                    m.thread_id.as_deref() == Some(thread_id.as_str())
                }
            })
            .filter(|m| after(m.created_at, since))
            .cloned()
            .collect();
        Ok(sorted(messages))
    }

    async fn list_members(&self, space_id: &str) -> Result<Vec<Participant>, SyncError> {
        let state = self.state();
        Self::check_space(&state, space_id)?;
        if let Some(members) = state.members.get(space_id) {
            return Ok(members.clone());
        }
        let mut members: Vec<Participant> = Vec::new();
        for message in state.messages.iter().filter(|m| m.space_id == space_id) {
            if !members.iter().any(|p| p.id == message.sender.id) {
                members.push(message.sender.clone());
            }
        }
        Ok(members)
    }
}

#[async_trait]
impl OriginWriter for MockSource {
    async fn create_message(
        &self,
        space_id: &str,
        thread_id: Option<&str>,
        text: &str,
    ) -> Result<String, SyncError> {
        let mut state = self.state();
        if let Some(failure) = state.write_failure {
            return Err(failure.to_error(space_id));
        }
        if !state.spaces.iter().any(|s| s.id == space_id) {
            return Err(SyncError::NotFound {
                resource: space_id.to_string(),
            });
        }

        state.next_id += 1;
        let n = state.next_id;
        let created_at = state
            .messages
            .iter()
            .map(|m| m.created_at)
            .max()
            .map_or_else(|| ts(0), |latest| latest + Duration::seconds(1));
        let message = Message {
            id: format!("{space_id}/messages/relay-{n}"),
            space_id: space_id.to_string(),
            thread_id: Some(
                thread_id
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{space_id}/threads/relay-{n}")),
            ),
            sender: Participant {
                id: APP_SENDER_ID.to_string(),
                display_name: "forumbridge".to_string(),
                email: None,
                is_bot: true,
            },
            text: text.to_string(),
            created_at,
        };
        state.messages.push(message.clone());
        state.created.push(message.clone());
        Ok(message.id)
    }
}
