// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Google Chat REST API.
//!
//! Provides [`GoogleChatClient`] which handles bearer authentication,
//! pagination, status mapping into [`SyncError`], and transient error retry.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use forumbridge_core::SyncError;
use forumbridge_resilience::RetryPolicy;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, RETRY_AFTER};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::types::{
    ApiErrorResponse, ApiMembership, ApiMessage, ApiSpace, ApiThread, CreateMessageRequest,
    ListMembershipsResponse, ListMessagesResponse, ListSpacesResponse,
};

/// HTTP client for Google Chat API communication.
#[derive(Debug, Clone)]
pub struct GoogleChatClient {
    client: reqwest::Client,
    base_url: String,
    page_size: u32,
    retry: RetryPolicy,
}

impl GoogleChatClient {
    /// Creates a new client authenticating with an already-issued bearer token.
    pub fn new(
        base_url: &str,
        access_token: &str,
        page_size: u32,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, SyncError> {
        let mut bearer = HeaderValue::from_str(&format!("Bearer {access_token}"))
            .map_err(|e| SyncError::Config(format!("invalid access token header value: {e}")))?;
        bearer.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size: page_size.max(1),
            retry,
        })
    }

    pub async fn list_spaces(&self) -> Result<Vec<ApiSpace>, SyncError> {
        let mut spaces = Vec::new();
        let mut page_token = None;
        loop {
            let query = self.page_query(page_token.take(), Vec::new());
            let page: ListSpacesResponse = self.get("list_spaces", "spaces", &query).await?;
            spaces.extend(page.spaces);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(spaces)
    }

    pub async fn get_space(&self, space_name: &str) -> Result<ApiSpace, SyncError> {
        self.get("get_space", space_name, &[]).await
    }

    /// Lists messages in a space, oldest first, optionally narrowed by a
    /// Chat API filter expression.
    pub async fn list_messages(
        &self,
        space_name: &str,
        filter: Option<String>,
    ) -> Result<Vec<ApiMessage>, SyncError> {
        let path = format!("{space_name}/messages");
        let mut messages = Vec::new();
        let mut page_token = None;
        loop {
            let mut extra = vec![("orderBy", "createTime asc".to_string())];
            if let Some(filter) = &filter {
                extra.push(("filter", filter.clone()));
            }
            let query = self.page_query(page_token.take(), extra);
            let page: ListMessagesResponse = self.get("list_messages", &path, &query).await?;
            messages.extend(page.messages);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        debug!(space = space_name, count = messages.len(), "listed messages");
        Ok(messages)
    }

    pub async fn list_memberships(
        &self,
        space_name: &str,
    ) -> Result<Vec<ApiMembership>, SyncError> {
        let path = format!("{space_name}/members");
        let mut memberships = Vec::new();
        let mut page_token = None;
        loop {
            let query = self.page_query(page_token.take(), Vec::new());
            let page: ListMembershipsResponse =
                self.get("list_memberships", &path, &query).await?;
            memberships.extend(page.memberships);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(memberships)
    }

    /// Posts a message, replying in `thread_name` when given. A thread that no
    /// longer exists falls back to a new thread.
    pub async fn create_message(
        &self,
        space_name: &str,
        text: &str,
        thread_name: Option<&str>,
    ) -> Result<ApiMessage, SyncError> {
        let url = format!("{}/{space_name}/messages", self.base_url);
        let url = &url;
        let body = CreateMessageRequest {
            text,
            thread: thread_name.map(|name| ApiThread {
                name: name.to_string(),
            }),
        };
        let body = &body;
        self.retry
            .run("create_message", || async move {
                let mut request = self.client.post(url).json(body);
                if body.thread.is_some() {
                    request = request.query(&[(
                        "messageReplyOption",
                        "REPLY_MESSAGE_FALLBACK_TO_NEW_THREAD",
                    )]);
                }
                let response = request.send().await.map_err(map_send_error)?;
                read_json(response).await
            })
            .await
    }

    fn page_query(
        &self,
        page_token: Option<String>,
        mut extra: Vec<(&'static str, String)>,
    ) -> Vec<(&'static str, String)> {
        extra.push(("pageSize", self.page_size.to_string()));
        if let Some(token) = page_token {
            extra.push(("pageToken", token));
        }
        extra
    }

    async fn get<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, SyncError> {
        let url = format!("{}/{path}", self.base_url);
        let url = &url;
        self.retry
            .run(operation, || async move {
                let response = self
                    .client
                    .get(url)
                    .query(query)
                    .send()
                    .await
                    .map_err(map_send_error)?;
                debug!(operation, status = %response.status(), "google chat response");
                read_json(response).await
            })
            .await
    }
}

/// Builds a `messages.list` filter for messages after `since`, optionally in one thread.
pub fn message_filter(since: Option<DateTime<Utc>>, thread_name: Option<&str>) -> Option<String> {
    let mut clauses = Vec::new();
    if let Some(since) = since {
        clauses.push(format!(
            "createTime > \"{}\"",
            since.to_rfc3339_opts(SecondsFormat::Nanos, true)
        ));
    }
    if let Some(thread) = thread_name {
        clauses.push(format!("thread.name = {thread}"));
    }
    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(" AND "))
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, SyncError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| SyncError::PermanentRemote {
                message: format!("failed to parse Google Chat response: {e}"),
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
        Ok(api_err) => format!(
            "Google Chat API error {} ({}): {}",
            api_err.error.code,
            api_err.error.status.as_deref().unwrap_or("UNKNOWN"),
            api_err.error.message
        ),
        Err(_) => format!("Google Chat returned {status}: {body}"),
    };
    Err(SyncError::from_http_status(status.as_u16(), message, retry_after))
}

fn map_send_error(e: reqwest::Error) -> SyncError {
    SyncError::TransientRemote {
        message: format!("HTTP request to Google Chat failed: {e}"),
        source: Some(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> GoogleChatClient {
        let retry = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            jitter: 0.0,
        };
        GoogleChatClient::new(base_url, "ya29.test", 2, Duration::from_secs(5), retry)
            .expect("client should build")
    }

    #[test]
    fn filter_combines_time_and_thread() {
        let since = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
        assert_eq!(message_filter(None, None), None);
        assert_eq!(
            message_filter(Some(since), Some("spaces/A/threads/T")).unwrap(),
            "createTime > \"2026-05-01T08:00:00.000000000Z\" AND thread.name = spaces/A/threads/T"
        );
    }

    #[tokio::test]
    async fn list_spaces_follows_page_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/spaces"))
            .and(query_param("pageToken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "spaces": [{"name": "spaces/C", "spaceType": "DIRECT_MESSAGE"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/spaces"))
            .and(header("Authorization", "Bearer ya29.test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "spaces": [
                    {"name": "spaces/A", "displayName": "Eng", "spaceType": "SPACE"},
                    {"name": "spaces/B", "type": "ROOM"}
                ],
                "nextPageToken": "p2"
            })))
            .mount(&server)
            .await;

        let spaces = test_client(&server.uri()).list_spaces().await.unwrap();
        let names: Vec<_> = spaces.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["spaces/A", "spaces/B", "spaces/C"]);
        assert_eq!(spaces[1].reported_type(), "ROOM");
    }

    #[tokio::test]
    async fn missing_space_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/spaces/GONE"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {"code": 404, "message": "Space not found", "status": "NOT_FOUND"}
            })))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .get_space("spaces/GONE")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound { .. }));
    }

    #[tokio::test]
    async fn rate_limit_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/spaces/A/members"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/spaces/A/members"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "memberships": [{"member": {"name": "users/1", "displayName": "Ann", "type": "HUMAN"}, "state": "JOINED"}]
            })))
            .mount(&server)
            .await;

        let members = test_client(&server.uri())
            .list_memberships("spaces/A")
            .await
            .unwrap();
        assert_eq!(members.len(), 1);
    }

    #[tokio::test]
    async fn reply_uses_fallback_option() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/spaces/A/messages"))
            .and(query_param(
                "messageReplyOption",
                "REPLY_MESSAGE_FALLBACK_TO_NEW_THREAD",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "spaces/A/messages/NEW",
                "createTime": "2026-05-01T08:00:00Z",
                "thread": {"name": "spaces/A/threads/T"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let created = test_client(&server.uri())
            .create_message("spaces/A", "hello", Some("spaces/A/threads/T"))
            .await
            .unwrap();
        assert_eq!(created.name, "spaces/A/messages/NEW");
    }
}
