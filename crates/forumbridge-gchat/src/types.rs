// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Chat REST API wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSpace {
    /// Resource name, `spaces/{space}`.
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// `SPACE`, `GROUP_CHAT` or `DIRECT_MESSAGE`.
    #[serde(default)]
    pub space_type: Option<String>,
    /// Deprecated field: `ROOM` or `DM`.
    #[serde(default, rename = "type")]
    pub legacy_type: Option<String>,
}

impl ApiSpace {
    /// The reported type, preferring the current field over the deprecated one.
    pub fn reported_type(&self) -> String {
        self.space_type
            .clone()
            .or_else(|| self.legacy_type.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSpacesResponse {
    #[serde(default)]
    pub spaces: Vec<ApiSpace>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUser {
    /// Resource name, `users/{user}`.
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// `HUMAN` or `BOT`.
    #[serde(default, rename = "type")]
    pub user_type: Option<String>,
}

impl ApiUser {
    pub fn is_bot(&self) -> bool {
        self.user_type.as_deref() == Some("BOT")
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiThread {
    /// Resource name, `spaces/{space}/threads/{thread}`.
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMessage {
    /// Resource name, `spaces/{space}/messages/{message}`.
    pub name: String,
    #[serde(default)]
    pub sender: Option<ApiUser>,
    pub create_time: DateTime<Utc>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub thread: Option<ApiThread>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMessagesResponse {
    #[serde(default)]
    pub messages: Vec<ApiMessage>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMembership {
    #[serde(default)]
    pub member: Option<ApiUser>,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMembershipsResponse {
    #[serde(default)]
    pub memberships: Vec<ApiMembership>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateMessageRequest<'a> {
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread: Option<ApiThread>,
}

/// Google API error envelope.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Token file written by the OAuth consent flow.
#[derive(Debug, Deserialize)]
pub struct TokenFile {
    #[serde(alias = "access_token")]
    pub token: String,
}
