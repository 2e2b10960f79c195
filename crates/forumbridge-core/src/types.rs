// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared between the adapters, the mapping store, and the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status of an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the role an adapter plays in the engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Source,
    Destination,
    Storage,
}

// --- Origin entities ---

/// Destination model a space is routed through.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SpaceKind {
    /// Multi-member room: category, topics, posts.
    Group,
    /// Private conversation: one DM chat channel.
    Direct,
}

/// A room on the origin platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub id: String,
    pub display_name: String,
    /// Type string exactly as the origin reported it.
    pub space_type: String,
}

/// A conversation thread inside a GROUP space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub space_id: String,
}

/// A human or automated account on the origin platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub display_name: String,
    pub email: Option<String>,
    pub is_bot: bool,
}

/// A single origin message. Immutable once synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub space_id: String,
    /// Present for GROUP spaces, absent for DIRECT spaces.
    pub thread_id: Option<String>,
    pub sender: Participant,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Where to list messages from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Container {
    /// Every message in a space (DIRECT path).
    Space(String),
    /// Messages of one thread (GROUP path).
    Thread { space_id: String, thread_id: String },
}

impl Container {
    pub fn space_id(&self) -> &str {
        match self {
            Container::Space(id) => id,
            Container::Thread { space_id, .. } => space_id,
        }
    }
}

// --- Mapping records ---

/// The six persisted origin -> destination relations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MappingKind {
    SpaceCategory,
    SpaceChannel,
    ThreadTopic,
    MessagePost,
    MessageChatMessage,
    User,
}

impl MappingKind {
    pub const ALL: [MappingKind; 6] = [
        MappingKind::SpaceCategory,
        MappingKind::SpaceChannel,
        MappingKind::ThreadTopic,
        MappingKind::MessagePost,
        MappingKind::MessageChatMessage,
        MappingKind::User,
    ];

    /// Backing table name in the mapping store.
    pub fn table(&self) -> &'static str {
        match self {
            MappingKind::SpaceCategory => "space_category",
            MappingKind::SpaceChannel => "space_channel",
            MappingKind::ThreadTopic => "thread_topic",
            MappingKind::MessagePost => "message_post",
            MappingKind::MessageChatMessage => "message_chat_message",
            MappingKind::User => "user_mapping",
        }
    }
}

/// One persisted mapping row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRecord {
    pub kind: MappingKind,
    pub origin_id: String,
    pub destination_id: String,
    /// Origin container of this entity (space of a thread, thread or space of a message).
    pub origin_parent_id: Option<String>,
    /// ISO 8601 timestamp.
    pub created_at: String,
}

/// A participant -> destination user mapping with the details seen at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub origin_id: String,
    pub handle: String,
    pub display_name: String,
    pub email: Option<String>,
}

// --- Destination side ---

/// Who a destination write is performed as.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActingIdentity {
    /// The sync engine's own account.
    Service,
    /// A mapped destination user, impersonated by handle.
    User(String),
}

impl ActingIdentity {
    /// Resolves to the username that should be sent to the destination.
    pub fn username<'a>(&'a self, service_username: &'a str) -> &'a str {
        match self {
            ActingIdentity::Service => service_username,
            ActingIdentity::User(handle) => handle,
        }
    }
}

/// Parameters for locating or creating the category bound to a GROUP space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRequest {
    pub space_id: String,
    pub name: String,
    /// Use this existing category instead of searching or creating.
    pub category_id: Option<String>,
    /// Create (or find) the category under this parent.
    pub parent_category_id: Option<String>,
}

/// IDs returned by topic creation: the topic and its opening post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTopic {
    pub topic_id: String,
    pub post_id: String,
}

/// A user account on the destination platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationUser {
    pub username: String,
    pub email: Option<String>,
}

/// Request to create a destination user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub name: String,
    pub email: String,
}

// --- Inbound notifications ---

/// A content-created notification from the destination platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentEvent {
    PostCreated {
        post_id: String,
        topic_id: String,
        username: String,
        raw: String,
    },
    ChatMessageCreated {
        message_id: String,
        channel_id: String,
        username: String,
        message: String,
    },
}

impl ContentEvent {
    /// Destination ID of the created entity.
    pub fn entity_id(&self) -> &str {
        match self {
            ContentEvent::PostCreated { post_id, .. } => post_id,
            ContentEvent::ChatMessageCreated { message_id, .. } => message_id,
        }
    }

    /// Destination ID of the containing topic or channel.
    pub fn container_id(&self) -> &str {
        match self {
            ContentEvent::PostCreated { topic_id, .. } => topic_id,
            ContentEvent::ChatMessageCreated { channel_id, .. } => channel_id,
        }
    }

    /// Username of the acting identity that created the entity.
    pub fn author(&self) -> &str {
        match self {
            ContentEvent::PostCreated { username, .. } => username,
            ContentEvent::ChatMessageCreated { username, .. } => username,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            ContentEvent::PostCreated { raw, .. } => raw,
            ContentEvent::ChatMessageCreated { message, .. } => message,
        }
    }

    /// Mapping relation holding the created entity.
    pub fn content_kind(&self) -> MappingKind {
        match self {
            ContentEvent::PostCreated { .. } => MappingKind::MessagePost,
            ContentEvent::ChatMessageCreated { .. } => MappingKind::MessageChatMessage,
        }
    }

    /// Mapping relation holding the container.
    pub fn container_kind(&self) -> MappingKind {
        match self {
            ContentEvent::PostCreated { .. } => MappingKind::ThreadTopic,
            ContentEvent::ChatMessageCreated { .. } => MappingKind::SpaceChannel,
        }
    }
}

/// Why an inbound event was not propagated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// Authored by the service identity.
    SelfOrigin,
    /// Already the destination side of a mapping.
    AlreadySynced,
    /// The containing topic or channel is not mapped to any origin container.
    UnmappedContainer,
    /// Nothing to send.
    EmptyContent,
    /// Propagation was attempted and failed.
    Rejected(String),
}

impl std::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IgnoreReason::SelfOrigin => write!(f, "self-origin"),
            IgnoreReason::AlreadySynced => write!(f, "already synced"),
            IgnoreReason::UnmappedContainer => write!(f, "unmapped container"),
            IgnoreReason::EmptyContent => write!(f, "empty content"),
            IgnoreReason::Rejected(reason) => write!(f, "rejected: {reason}"),
        }
    }
}

/// Result of handling one inbound event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EventOutcome {
    Accepted { origin_message_id: String },
    Ignored { reason: IgnoreReason },
}

impl EventOutcome {
    pub fn ignored(reason: IgnoreReason) -> Self {
        EventOutcome::Ignored { reason }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, EventOutcome::Accepted { .. })
    }
}
