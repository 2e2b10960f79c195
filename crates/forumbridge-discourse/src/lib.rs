// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discourse destination adapter for forumbridge.
//!
//! This crate implements [`DestinationWriter`] over the Discourse REST API
//! (categories, topics, posts, users) and the chat plugin API (direct-message
//! channels and chat messages). Every write carries an explicit acting identity.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use forumbridge_config::model::DiscourseConfig;
use forumbridge_core::{
    ActingIdentity, AdapterType, CategoryRequest, CreatedTopic, DestinationUser,
    DestinationWriter, HealthStatus, NewUser, PluginAdapter, SyncError,
};
use forumbridge_resilience::RetryPolicy;
use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::{debug, info};

use crate::client::DiscourseClient;
use crate::types::{CreatePostRequest, CreateUserRequest};

/// Discourse category names are limited to 50 characters.
const MAX_CATEGORY_NAME_CHARS: usize = 50;

/// Length of the random password given to created users. They sign in via
/// password reset if they ever need to.
const GENERATED_PASSWORD_LEN: usize = 32;

/// Discourse implementation of [`DestinationWriter`].
pub struct DiscourseDestination {
    client: DiscourseClient,
}

impl DiscourseDestination {
    /// Creates the adapter from configuration.
    ///
    /// Requires `discourse.url` and `discourse.api_key`.
    pub fn new(config: &DiscourseConfig, retry: RetryPolicy) -> Result<Self, SyncError> {
        if config.url.trim().is_empty() {
            return Err(SyncError::Config("discourse.url is not set".into()));
        }
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| SyncError::Config("discourse.api_key is not set".into()))?;
        let client = DiscourseClient::new(
            &config.url,
            api_key,
            &config.api_username,
            Duration::from_secs(config.request_timeout_secs),
            retry,
        )?;
        info!(
            url = %config.url,
            api_username = %config.api_username,
            "Discourse adapter initialized"
        );
        Ok(Self { client })
    }

    /// Creates an adapter around an existing client (for testing).
    pub fn with_client(client: DiscourseClient) -> Self {
        Self { client }
    }

    fn acting_username<'a>(&'a self, acting: &'a ActingIdentity) -> &'a str {
        acting.username(self.client.api_username())
    }
}

fn parse_id(raw: &str, what: &str) -> Result<u64, SyncError> {
    raw.parse::<u64>()
        .map_err(|_| SyncError::Internal(format!("invalid Discourse {what} id `{raw}`")))
}

fn category_name(request: &CategoryRequest) -> String {
    let name = request.name.trim();
    let name = if name.is_empty() {
        request.space_id.as_str()
    } else {
        name
    };
    name.chars().take(MAX_CATEGORY_NAME_CHARS).collect()
}

fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

#[async_trait]
impl PluginAdapter for DiscourseDestination {
    fn name(&self) -> &str {
        "discourse"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Destination
    }

    async fn health_check(&self) -> Result<HealthStatus, SyncError> {
        match self.user_exists(self.client.api_username()).await {
            Ok(true) => Ok(HealthStatus::Healthy),
            Ok(false) => Ok(HealthStatus::Unhealthy(format!(
                "service user `{}` does not exist",
                self.client.api_username()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), SyncError> {
        Ok(())
    }
}

#[async_trait]
impl DestinationWriter for DiscourseDestination {
    async fn find_or_create_category(
        &self,
        request: &CategoryRequest,
        acting: &ActingIdentity,
    ) -> Result<String, SyncError> {
        if let Some(configured) = &request.category_id {
            let id = self.client.show_category(parse_id(configured, "category")?).await?;
            debug!(space_id = %request.space_id, category_id = id, "using configured category");
            return Ok(id.to_string());
        }

        let parent = request
            .parent_category_id
            .as_deref()
            .map(|p| parse_id(p, "parent category"))
            .transpose()?;
        let name = category_name(request);

        let existing = self.client.list_categories().await?.into_iter().find(|c| {
            c.parent_category_id == parent && c.name.eq_ignore_ascii_case(&name)
        });
        if let Some(category) = existing {
            debug!(
                space_id = %request.space_id,
                category_id = category.id,
                "found category by name"
            );
            return Ok(category.id.to_string());
        }

        let id = self
            .client
            .create_category(&name, parent, self.acting_username(acting))
            .await?;
        info!(space_id = %request.space_id, category_id = id, name = %name, "created category");
        Ok(id.to_string())
    }

    async fn create_topic(
        &self,
        category_id: &str,
        title: &str,
        body: &str,
        acting: &ActingIdentity,
    ) -> Result<CreatedTopic, SyncError> {
        let request = CreatePostRequest {
            raw: body,
            title: Some(title),
            category: Some(parse_id(category_id, "category")?),
            topic_id: None,
        };
        let created = self
            .client
            .create_post(&request, self.acting_username(acting))
            .await?;
        Ok(CreatedTopic {
            topic_id: created.topic_id.to_string(),
            post_id: created.id.to_string(),
        })
    }

    async fn create_post(
        &self,
        topic_id: &str,
        body: &str,
        acting: &ActingIdentity,
    ) -> Result<String, SyncError> {
        let request = CreatePostRequest {
            raw: body,
            title: None,
            category: None,
            topic_id: Some(parse_id(topic_id, "topic")?),
        };
        let created = self
            .client
            .create_post(&request, self.acting_username(acting))
            .await?;
        Ok(created.id.to_string())
    }

    async fn lookup_user(&self, username: &str) -> Result<Option<DestinationUser>, SyncError> {
        let Some(user) = self.client.get_user(username).await? else {
            return Ok(None);
        };
        let email = match user.email {
            Some(email) => Some(email),
            None => match self.client.get_user_email(&user.username).await {
                Ok(email) => email,
                Err(e) if e.is_transient() => return Err(e),
                Err(e) => {
                    debug!(username, error = %e, "email lookup failed");
                    None
                }
            },
        };
        Ok(Some(DestinationUser {
            username: user.username,
            email,
        }))
    }

    async fn user_exists(&self, username: &str) -> Result<bool, SyncError> {
        Ok(self.client.get_user(username).await?.is_some())
    }

    async fn create_user(&self, user: &NewUser) -> Result<DestinationUser, SyncError> {
        let password = generate_password();
        let request = CreateUserRequest {
            name: &user.name,
            username: &user.username,
            email: &user.email,
            password: &password,
            active: true,
            approved: true,
        };
        let user_id = self.client.create_user(&request).await?;
        info!(username = %user.username, user_id, "created Discourse user");
        Ok(DestinationUser {
            username: user.username.clone(),
            email: Some(user.email.clone()),
        })
    }

    async fn create_dm_channel(
        &self,
        usernames: &[String],
        acting: &ActingIdentity,
    ) -> Result<String, SyncError> {
        let id = self
            .client
            .create_dm_channel(usernames, self.acting_username(acting))
            .await?;
        Ok(id.to_string())
    }

    async fn create_chat_message(
        &self,
        channel_id: &str,
        text: &str,
        acting: &ActingIdentity,
    ) -> Result<String, SyncError> {
        let id = self
            .client
            .create_chat_message(
                parse_id(channel_id, "channel")?,
                text,
                self.acting_username(acting),
            )
            .await?;
        Ok(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(server: &MockServer) -> DiscourseDestination {
        let config = DiscourseConfig {
            url: server.uri(),
            api_key: Some("test-key".into()),
            api_username: "system".into(),
            request_timeout_secs: 5,
        };
        DiscourseDestination::new(&config, RetryPolicy::no_retry()).expect("adapter")
    }

    fn request(name: &str) -> CategoryRequest {
        CategoryRequest {
            space_id: "spaces/AAA".into(),
            name: name.into(),
            category_id: None,
            parent_category_id: None,
        }
    }

    #[test]
    fn new_requires_api_key() {
        let config = DiscourseConfig {
            url: "https://forum.example.com".into(),
            ..DiscourseConfig::default()
        };
        assert!(matches!(
            DiscourseDestination::new(&config, RetryPolicy::no_retry()),
            Err(SyncError::Config(_))
        ));
    }

    #[test]
    fn category_names_are_truncated_and_never_empty() {
        let long = "x".repeat(80);
        assert_eq!(category_name(&request(&long)).chars().count(), 50);
        assert_eq!(category_name(&request("   ")), "spaces/AAA");
    }

    #[test]
    fn generated_passwords_are_alphanumeric() {
        let password = generate_password();
        assert_eq!(password.len(), GENERATED_PASSWORD_LEN);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[tokio::test]
    async fn existing_category_is_found_by_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/site.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "categories": [
                    {"id": 4, "name": "Engineering", "parent_category_id": 2},
                    {"id": 5, "name": "engineering"}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/categories.json"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let id = adapter(&server)
            .find_or_create_category(&request("Engineering"), &ActingIdentity::Service)
            .await
            .unwrap();
        assert_eq!(id, "5");
    }

    #[tokio::test]
    async fn missing_category_is_created_under_parent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/site.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"categories": []})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/categories.json"))
            .and(body_partial_json(serde_json::json!({
                "name": "Design",
                "parent_category_id": 2,
                "color": "0088CC"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"category": {"id": 17}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut req = request("Design");
        req.parent_category_id = Some("2".into());
        let id = adapter(&server)
            .find_or_create_category(&req, &ActingIdentity::Service)
            .await
            .unwrap();
        assert_eq!(id, "17");
    }

    #[tokio::test]
    async fn topic_creation_returns_topic_and_first_post() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/posts.json"))
            .and(header("Api-Username", "alice"))
            .and(body_partial_json(serde_json::json!({
                "title": "Kickoff",
                "category": 5
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": 100, "topic_id": 40})),
            )
            .mount(&server)
            .await;

        let created = adapter(&server)
            .create_topic(
                "5",
                "Kickoff",
                "Kickoff\n\nagenda",
                &ActingIdentity::User("alice".into()),
            )
            .await
            .unwrap();
        assert_eq!(created.topic_id, "40");
        assert_eq!(created.post_id, "100");
    }

    #[tokio::test]
    async fn lookup_user_fetches_email_separately() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/u/alice.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"user": {"username": "alice"}})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/u/alice/emails.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"email": "alice@forumbridge.invalid"}),
            ))
            .mount(&server)
            .await;

        let user = adapter(&server).lookup_user("alice").await.unwrap().unwrap();
        assert_eq!(user.email.as_deref(), Some("alice@forumbridge.invalid"));
    }

    #[tokio::test]
    async fn dm_channel_targets_all_participants() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/api/direct-message-channels.json"))
            .and(body_partial_json(
                serde_json::json!({"target_usernames": ["alice", "bob"]}),
            ))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"channel": {"id": 12}})),
            )
            .mount(&server)
            .await;

        let id = adapter(&server)
            .create_dm_channel(
                &["alice".to_string(), "bob".to_string()],
                &ActingIdentity::User("alice".into()),
            )
            .await
            .unwrap();
        assert_eq!(id, "12");
    }

    #[tokio::test]
    async fn health_check_reports_missing_service_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/u/system.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let status = adapter(&server).health_check().await.unwrap();
        assert!(matches!(status, HealthStatus::Unhealthy(_)));
    }
}
