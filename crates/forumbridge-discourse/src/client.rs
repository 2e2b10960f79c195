// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Discourse REST and chat APIs.
//!
//! Provides [`DiscourseClient`] which handles API-key authentication,
//! per-request user impersonation through `Api-Username`, status mapping
//! into [`SyncError`], and transient error retry via [`RetryPolicy`].

use std::time::Duration;

use forumbridge_core::SyncError;
use forumbridge_resilience::RetryPolicy;
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::types::{
    ApiErrorResponse, ChatMessageResponse, CreateCategoryRequest, CreateCategoryResponse,
    CreateChatMessageRequest, CreateDmChannelRequest, CreatePostRequest, CreatePostResponse,
    CreateUserRequest, CreateUserResponse, DmChannelResponse, CategoryShowResponse,
    EmailsResponse, SiteCategory, SiteResponse, UserDetail, UserResponse,
};

/// Default colors for categories created on behalf of a space.
const CATEGORY_COLOR: &str = "0088CC";
const CATEGORY_TEXT_COLOR: &str = "FFFFFF";

/// HTTP client for Discourse API communication.
#[derive(Debug, Clone)]
pub struct DiscourseClient {
    client: reqwest::Client,
    base_url: String,
    api_username: String,
    retry: RetryPolicy,
}

impl DiscourseClient {
    /// Creates a new Discourse client.
    ///
    /// # Arguments
    /// * `base_url` - Forum root, e.g. `https://forum.example.com`
    /// * `api_key` - Admin API key valid for all users
    /// * `api_username` - Service identity used when no user is impersonated
    pub fn new(
        base_url: &str,
        api_key: &str,
        api_username: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, SyncError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Api-Key",
            HeaderValue::from_str(api_key)
                .map_err(|e| SyncError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert("Accept", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_username: api_username.to_string(),
            retry,
        })
    }

    /// The service identity.
    pub fn api_username(&self) -> &str {
        &self.api_username
    }

    // --- Categories ---

    /// Every category on the site, subcategories included.
    pub async fn list_categories(&self) -> Result<Vec<SiteCategory>, SyncError> {
        let site: SiteResponse = self
            .send("list_categories", Method::GET, "/site.json", &self.api_username, None::<&()>)
            .await?;
        Ok(site.categories)
    }

    /// Confirms a category exists and returns its ID.
    pub async fn show_category(&self, category_id: u64) -> Result<u64, SyncError> {
        let path = format!("/c/{category_id}/show.json");
        let shown: CategoryShowResponse = self
            .send("show_category", Method::GET, &path, &self.api_username, None::<&()>)
            .await?;
        Ok(shown.category.id)
    }

    pub async fn create_category(
        &self,
        name: &str,
        parent_category_id: Option<u64>,
        acting: &str,
    ) -> Result<u64, SyncError> {
        let body = CreateCategoryRequest {
            name,
            color: CATEGORY_COLOR,
            text_color: CATEGORY_TEXT_COLOR,
            parent_category_id,
        };
        let created: CreateCategoryResponse = self
            .send("create_category", Method::POST, "/categories.json", acting, Some(&body))
            .await?;
        Ok(created.category.id)
    }

    // --- Topics and posts ---

    pub async fn create_post(
        &self,
        request: &CreatePostRequest<'_>,
        acting: &str,
    ) -> Result<CreatePostResponse, SyncError> {
        self.send("create_post", Method::POST, "/posts.json", acting, Some(request))
            .await
    }

    // --- Users ---

    /// Returns `None` when the username does not exist.
    pub async fn get_user(&self, username: &str) -> Result<Option<UserDetail>, SyncError> {
        let path = format!("/u/{username}.json");
        match self
            .send::<UserResponse, ()>("get_user", Method::GET, &path, &self.api_username, None)
            .await
        {
            Ok(response) => Ok(Some(response.user)),
            Err(SyncError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Primary email of a user. Requires an admin key.
    pub async fn get_user_email(&self, username: &str) -> Result<Option<String>, SyncError> {
        let path = format!("/u/{username}/emails.json");
        let emails: EmailsResponse = self
            .send("get_user_email", Method::GET, &path, &self.api_username, None::<&()>)
            .await?;
        Ok(emails.email)
    }

    /// Creates an active, approved user. A taken username or email maps to `Conflict`.
    pub async fn create_user(&self, request: &CreateUserRequest<'_>) -> Result<u64, SyncError> {
        let url = format!("{}/users.json", self.base_url);
        let url = &url;
        let api_username = self.api_username.as_str();
        let response: CreateUserResponse = self
            .retry
            .run("create_user", || async move {
                let response = self
                    .client
                    .post(url)
                    .header("Api-Username", api_username)
                    .json(request)
                    .send()
                    .await
                    .map_err(map_send_error)?;
                if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
                    let body = response.text().await.unwrap_or_default();
                    let parsed =
                        serde_json::from_str::<CreateUserResponse>(&body).unwrap_or_default();
                    return Err(classify_user_rejection(&parsed, &body));
                }
                read_json(response).await
            })
            .await?;

        if !response.success {
            return Err(classify_user_rejection(&response, ""));
        }
        response.user_id.ok_or_else(|| SyncError::PermanentRemote {
            message: "user created but no user_id returned".into(),
        })
    }

    // --- Chat ---

    pub async fn create_dm_channel(
        &self,
        usernames: &[String],
        acting: &str,
    ) -> Result<u64, SyncError> {
        let body = CreateDmChannelRequest {
            target_usernames: usernames,
        };
        let created: DmChannelResponse = self
            .send(
                "create_dm_channel",
                Method::POST,
                "/chat/api/direct-message-channels.json",
                acting,
                Some(&body),
            )
            .await?;
        Ok(created.channel.id)
    }

    pub async fn create_chat_message(
        &self,
        channel_id: u64,
        message: &str,
        acting: &str,
    ) -> Result<u64, SyncError> {
        let path = format!("/chat/{channel_id}.json");
        let body = CreateChatMessageRequest { message };
        let created: ChatMessageResponse = self
            .send("create_chat_message", Method::POST, &path, acting, Some(&body))
            .await?;
        Ok(created.message_id)
    }

    /// Sends one request, retrying transient failures per the injected policy.
    async fn send<T, B>(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        acting: &str,
        body: Option<&B>,
    ) -> Result<T, SyncError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        let url = format!("{}{}", self.base_url, path);
        let url = &url;
        let method = &method;
        self.retry
            .run(operation, || async move {
                let mut request = self
                    .client
                    .request(method.clone(), url)
                    .header("Api-Username", acting);
                if let Some(body) = body {
                    request = request.json(body);
                }
                let response = request.send().await.map_err(map_send_error)?;
                debug!(operation, status = %response.status(), acting, "discourse response");
                read_json(response).await
            })
            .await
    }
}

/// Decode a success body or map the failure status into the taxonomy.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, SyncError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| SyncError::PermanentRemote {
                message: format!("failed to parse Discourse response: {e}"),
            });
    }

    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(api_err) if !api_err.errors.is_empty() => format!(
            "Discourse returned {status} ({}): {}",
            api_err.error_type.as_deref().unwrap_or("error"),
            api_err.errors.join("; ")
        ),
        _ => format!("Discourse returned {status}: {body}"),
    };
    Err(SyncError::from_http_status(status.as_u16(), message, retry_after))
}

fn map_send_error(e: reqwest::Error) -> SyncError {
    SyncError::TransientRemote {
        message: format!("HTTP request to Discourse failed: {e}"),
        source: Some(Box::new(e)),
    }
}

/// A rejected signup is a `Conflict` when the username or email is taken.
fn classify_user_rejection(response: &CreateUserResponse, raw: &str) -> SyncError {
    let taken = ["username", "email"]
        .iter()
        .any(|field| response.errors.get(*field).is_some_and(|v| !v.is_empty()));
    let message = response
        .message
        .clone()
        .unwrap_or_else(|| raw.to_string());
    if taken {
        SyncError::Conflict { message }
    } else {
        SyncError::PermanentRemote { message }
    }
}
