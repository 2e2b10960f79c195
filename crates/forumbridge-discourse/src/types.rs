// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discourse REST API wire types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// `GET /site.json`: flat category list including subcategories.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteResponse {
    #[serde(default)]
    pub categories: Vec<SiteCategory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteCategory {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub parent_category_id: Option<u64>,
}

/// `POST /categories.json`
#[derive(Debug, Serialize)]
pub struct CreateCategoryRequest<'a> {
    pub name: &'a str,
    pub color: &'a str,
    pub text_color: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_category_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryResponse {
    pub category: CategoryRef,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRef {
    pub id: u64,
}

/// `GET /c/{id}/show.json`
#[derive(Debug, Deserialize)]
pub struct CategoryShowResponse {
    pub category: CategoryRef,
}

/// `POST /posts.json`, used for both topics (title + category) and replies (topic_id).
#[derive(Debug, Serialize)]
pub struct CreatePostRequest<'a> {
    pub raw: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostResponse {
    pub id: u64,
    pub topic_id: u64,
}

/// `GET /u/{username}.json`
#[derive(Debug, Deserialize)]
pub struct UserResponse {
    pub user: UserDetail,
}

#[derive(Debug, Deserialize)]
pub struct UserDetail {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// `GET /u/{username}/emails.json` (admin only)
#[derive(Debug, Deserialize)]
pub struct EmailsResponse {
    #[serde(default)]
    pub email: Option<String>,
}

/// `POST /users.json`
#[derive(Debug, Serialize)]
pub struct CreateUserRequest<'a> {
    pub name: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub active: bool,
    pub approved: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub user_id: Option<u64>,
}

/// `POST /chat/api/direct-message-channels.json`
#[derive(Debug, Serialize)]
pub struct CreateDmChannelRequest<'a> {
    pub target_usernames: &'a [String],
}

#[derive(Debug, Deserialize)]
pub struct DmChannelResponse {
    pub channel: ChannelRef,
}

#[derive(Debug, Deserialize)]
pub struct ChannelRef {
    pub id: u64,
}

/// `POST /chat/{channel_id}.json`
#[derive(Debug, Serialize)]
pub struct CreateChatMessageRequest<'a> {
    pub message: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessageResponse {
    #[serde(alias = "id")]
    pub message_id: u64,
}

/// Error body shared by most endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub error_type: Option<String>,
}
