// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock destination forum for deterministic testing.
//!
//! `MockDestination` implements `DestinationWriter` with in-memory
//! categories, topics, posts, users and DM channels. Every call is counted,
//! and failures can be queued per operation or triggered by content.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use forumbridge_core::{
    ActingIdentity, AdapterType, CategoryRequest, CreatedTopic, DestinationUser,
    DestinationWriter, HealthStatus, NewUser, PluginAdapter, SyncError,
};

use crate::fixtures::Failure;

/// Destination operations, for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestinationOp {
    FindCategory,
    CreateTopic,
    CreatePost,
    LookupUser,
    CreateUser,
    CreateDmChannel,
    CreateChatMessage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCategory {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockTopic {
    pub id: String,
    pub category_id: String,
    pub title: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockPost {
    pub id: String,
    pub topic_id: String,
    pub raw: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockChannel {
    pub id: String,
    pub usernames: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockChatMessage {
    pub id: String,
    pub channel_id: String,
    pub text: String,
    pub username: String,
}

#[derive(Default)]
struct DestinationState {
    categories: Vec<MockCategory>,
    category_requests: Vec<CategoryRequest>,
    topics: Vec<MockTopic>,
    posts: Vec<MockPost>,
    users: BTreeMap<String, DestinationUser>,
    channels: Vec<MockChannel>,
    chat_messages: Vec<MockChatMessage>,
    calls: HashMap<DestinationOp, usize>,
    queued: HashMap<DestinationOp, VecDeque<Failure>>,
    failing_content: Vec<(String, Failure)>,
    next_id: u64,
}

impl DestinationState {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    /// Counts the call and pops a queued failure, if any.
    fn enter(&mut self, op: DestinationOp) -> Result<(), SyncError> {
        *self.calls.entry(op).or_default() += 1;
        match self.queued.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(failure) => Err(failure.to_error(&format!("{op:?}"))),
            None => Ok(()),
        }
    }

    fn check_content(&self, text: &str) -> Result<(), SyncError> {
        match self
            .failing_content
            .iter()
            .find(|(needle, _)| text.contains(needle.as_str()))
        {
            Some((needle, failure)) => Err(failure.to_error(needle)),
            None => Ok(()),
        }
    }
}

/// An in-memory destination forum.
pub struct MockDestination {
    service_username: String,
    state: Mutex<DestinationState>,
}

impl MockDestination {
    /// Creates an empty forum whose service identity is `system`.
    pub fn new() -> Self {
        Self {
            service_username: "system".to_string(),
            state: Mutex::new(DestinationState::default()),
        }
    }

    /// Adds a pre-existing user.
    pub fn with_user(self, username: &str, email: Option<&str>) -> Self {
        self.state().users.insert(
            username.to_string(),
            DestinationUser {
                username: username.to_string(),
                email: email.map(str::to_string),
            },
        );
        self
    }

    /// Makes the next call of `op` fail once with `failure`.
    pub async fn fail_next(&self, op: DestinationOp, failure: Failure) {
        self.state().queued.entry(op).or_default().push_back(failure);
    }

    /// Makes every content write whose text contains `needle` fail.
    pub async fn fail_content(&self, needle: &str, failure: Failure) {
        self.state()
            .failing_content
            .push((needle.to_string(), failure));
    }

    pub async fn clear_failures(&self) {
        let mut state = self.state();
        state.queued.clear();
        state.failing_content.clear();
    }

    pub async fn calls(&self, op: DestinationOp) -> usize {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    pub async fn categories(&self) -> Vec<MockCategory> {
        self.state().categories.clone()
    }

    pub async fn category_requests(&self) -> Vec<CategoryRequest> {
        self.state().category_requests.clone()
    }

    pub async fn topics(&self) -> Vec<MockTopic> {
        self.state().topics.clone()
    }

    /// All posts, opening posts included, in creation order.
    pub async fn posts(&self) -> Vec<MockPost> {
        self.state().posts.clone()
    }

    pub async fn posts_in(&self, topic_id: &str) -> Vec<MockPost> {
        self.state()
            .posts
            .iter()
            .filter(|p| p.topic_id == topic_id)
            .cloned()
            .collect()
    }

    pub async fn users(&self) -> Vec<DestinationUser> {
        self.state().users.values().cloned().collect()
    }

    pub async fn user(&self, username: &str) -> Option<DestinationUser> {
        self.state().users.get(username).cloned()
    }

    pub async fn channels(&self) -> Vec<MockChannel> {
        self.state().channels.clone()
    }

    pub async fn chat_messages(&self) -> Vec<MockChatMessage> {
        self.state().chat_messages.clone()
    }

    fn state(&self) -> MutexGuard<'_, DestinationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn username(&self, acting: &ActingIdentity) -> String {
        acting.username(&self.service_username).to_string()
    }
}

impl Default for MockDestination {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockDestination {
    fn name(&self) -> &str {
        "mock-destination"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Destination
    }

    async fn health_check(&self) -> Result<HealthStatus, SyncError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SyncError> {
        Ok(())
    }
}

#[async_trait]
impl DestinationWriter for MockDestination {
    async fn find_or_create_category(
        &self,
        request: &CategoryRequest,
        _acting: &ActingIdentity,
    ) -> Result<String, SyncError> {
        let mut state = self.state();
        state.enter(DestinationOp::FindCategory)?;
        state.category_requests.push(request.clone());

        if let Some(configured) = &request.category_id {
            if state.categories.iter().any(|c| &c.id == configured) {
                return Ok(configured.clone());
            }
            // Configured categories are assumed to exist on the real forum.
            state.categories.push(MockCategory {
                id: configured.clone(),
                name: request.name.clone(),
                parent_id: None,
            });
            return Ok(configured.clone());
        }

        if let Some(existing) = state.categories.iter().find(|c| {
            c.parent_id == request.parent_category_id && c.name.eq_ignore_ascii_case(&request.name)
        }) {
            return Ok(existing.id.clone());
        }
        let id = state.next_id();
        state.categories.push(MockCategory {
            id: id.clone(),
            name: request.name.clone(),
            parent_id: request.parent_category_id.clone(),
        });
        Ok(id)
    }

    async fn create_topic(
        &self,
        category_id: &str,
        title: &str,
        body: &str,
        acting: &ActingIdentity,
    ) -> Result<CreatedTopic, SyncError> {
        let username = self.username(acting);
        let mut state = self.state();
        state.enter(DestinationOp::CreateTopic)?;
        state.check_content(body)?;
        if !state.categories.iter().any(|c| c.id == category_id) {
            return Err(SyncError::NotFound {
                resource: format!("category {category_id}"),
            });
        }
        let topic_id = state.next_id();
        let post_id = state.next_id();
        state.topics.push(MockTopic {
            id: topic_id.clone(),
            category_id: category_id.to_string(),
            title: title.to_string(),
            username: username.clone(),
        });
        state.posts.push(MockPost {
            id: post_id.clone(),
            topic_id: topic_id.clone(),
            raw: body.to_string(),
            username,
        });
        Ok(CreatedTopic { topic_id, post_id })
    }

    async fn create_post(
        &self,
        topic_id: &str,
        body: &str,
        acting: &ActingIdentity,
    ) -> Result<String, SyncError> {
        let username = self.username(acting);
        let mut state = self.state();
        state.enter(DestinationOp::CreatePost)?;
        state.check_content(body)?;
        if !state.topics.iter().any(|t| t.id == topic_id) {
            return Err(SyncError::NotFound {
                resource: format!("topic {topic_id}"),
            });
        }
        let id = state.next_id();
        state.posts.push(MockPost {
            id: id.clone(),
            topic_id: topic_id.to_string(),
            raw: body.to_string(),
            username,
        });
        Ok(id)
    }

    async fn lookup_user(&self, username: &str) -> Result<Option<DestinationUser>, SyncError> {
        let mut state = self.state();
        state.enter(DestinationOp::LookupUser)?;
        Ok(state.users.get(username).cloned())
    }

    async fn create_user(&self, user: &NewUser) -> Result<DestinationUser, SyncError> {
        let mut state = self.state();
        state.enter(DestinationOp::CreateUser)?;
        if state.users.contains_key(&user.username) {
            return Err(SyncError::Conflict {
                message: format!("username {} is taken", user.username),
            });
        }
        let created = DestinationUser {
            username: user.username.clone(),
            email: Some(user.email.clone()),
        };
        state.users.insert(user.username.clone(), created.clone());
        Ok(created)
    }

    async fn create_dm_channel(
        &self,
        usernames: &[String],
        _acting: &ActingIdentity,
    ) -> Result<String, SyncError> {
        let mut state = self.state();
        state.enter(DestinationOp::CreateDmChannel)?;
        if let Some(missing) = usernames.iter().find(|u| !state.users.contains_key(*u)) {
            return Err(SyncError::PermanentRemote {
                message: format!("unknown user {missing}"),
            });
        }
        let id = state.next_id();
        state.channels.push(MockChannel {
            id: id.clone(),
            usernames: usernames.to_vec(),
        });
        Ok(id)
    }

    async fn create_chat_message(
        &self,
        channel_id: &str,
        text: &str,
        acting: &ActingIdentity,
    ) -> Result<String, SyncError> {
        let username = self.username(acting);
        let mut state = self.state();
        state.enter(DestinationOp::CreateChatMessage)?;
        state.check_content(text)?;
        if !state.channels.iter().any(|c| c.id == channel_id) {
            return Err(SyncError::NotFound {
                resource: format!("channel {channel_id}"),
            });
        }
        let id = state.next_id();
        state.chat_messages.push(MockChatMessage {
            id: id.clone(),
            channel_id: channel_id.to_string(),
            text: text.to_string(),
            username,
        });
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queued_failure_fires_once() {
        let destination = MockDestination::new();
        destination
            .fail_next(DestinationOp::LookupUser, Failure::Transient)
            .await;

        assert!(destination.lookup_user("ann").await.is_err());
        assert!(destination.lookup_user("ann").await.unwrap().is_none());
        assert_eq!(destination.calls(DestinationOp::LookupUser).await, 2);
    }

    #[tokio::test]
    async fn taken_username_conflicts() {
        let destination = MockDestination::new().with_user("ann", None);
        let err = destination
            .create_user(&NewUser {
                username: "ann".into(),
                name: "Ann".into(),
                email: "ann@forumbridge.invalid".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Conflict { .. }));
    }

    #[tokio::test]
    async fn find_or_create_user_returns_existing_user() {
        let destination = MockDestination::new().with_user("ann", Some("ann@example.com"));
        let request = NewUser {
            username: "ann".into(),
            name: "Ann".into(),
            email: "ann@forumbridge.invalid".into(),
        };

        let user = destination.find_or_create_user(&request).await.unwrap();
        assert_eq!(user.email.as_deref(), Some("ann@example.com"));
        assert_eq!(destination.calls(DestinationOp::CreateUser).await, 0);

        assert!(!destination.user_exists("bo").await.unwrap());
        let bo = NewUser {
            username: "bo".into(),
            ..request
        };
        destination.find_or_create_user(&bo).await.unwrap();
        assert!(destination.user_exists("bo").await.unwrap());
    }

    #[tokio::test]
    async fn categories_are_found_by_name_and_parent() {
        let destination = MockDestination::new();
        let request = CategoryRequest {
            space_id: "spaces/A".into(),
            name: "Eng".into(),
            category_id: None,
            parent_category_id: None,
        };
        let first = destination
            .find_or_create_category(&request, &ActingIdentity::Service)
            .await
            .unwrap();
        let again = destination
            .find_or_create_category(
                &CategoryRequest {
                    name: "ENG".into(),
                    ..request
                },
                &ActingIdentity::Service,
            )
            .await
            .unwrap();
        assert_eq!(first, again);
        assert_eq!(destination.categories().await.len(), 1);
    }
}
