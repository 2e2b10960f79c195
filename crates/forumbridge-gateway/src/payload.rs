// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discourse webhook payloads and their validation into [`ContentEvent`].

use forumbridge_core::{ContentEvent, SyncError};
use serde::Deserialize;
use serde::de::DeserializeOwned;

pub const EVENT_TYPE_HEADER: &str = "x-discourse-event-type";
pub const EVENT_HEADER: &str = "x-discourse-event";

/// A delivery after header and payload validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Content(ContentEvent),
    /// A well-formed delivery for an event that is not propagated
    /// (edits, deletions, topic and user events, pings).
    Unsupported { event_type: String, event: String },
}

/// Discourse sends IDs as numbers; accept strings too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireId {
    Number(u64),
    Text(String),
}

impl WireId {
    fn into_string(self) -> String {
        match self {
            WireId::Number(n) => n.to_string(),
            WireId::Text(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PostEnvelope {
    post: PostPayload,
}

#[derive(Debug, Deserialize)]
struct PostPayload {
    id: WireId,
    topic_id: WireId,
    username: String,
    #[serde(default)]
    raw: String,
}

#[derive(Debug, Deserialize)]
struct ChatEnvelope {
    chat_message: ChatPayload,
}

#[derive(Debug, Deserialize)]
struct ChatPayload {
    message: ChatMessagePayload,
    #[serde(default)]
    channel: Option<ChatChannelPayload>,
}

#[derive(Debug, Deserialize)]
struct ChatMessagePayload {
    id: WireId,
    #[serde(default)]
    message: String,
    user: ChatUserPayload,
    #[serde(default)]
    chat_channel_id: Option<WireId>,
}

#[derive(Debug, Deserialize)]
struct ChatChannelPayload {
    id: WireId,
}

#[derive(Debug, Deserialize)]
struct ChatUserPayload {
    username: String,
}

/// Validates a delivery from its event headers and raw body.
///
/// Missing headers, malformed JSON, or missing required fields for a
/// supported event yield [`SyncError::InvalidEvent`].
pub fn parse_delivery(
    event_type: Option<&str>,
    event: Option<&str>,
    body: &[u8],
) -> Result<Delivery, SyncError> {
    let event_type = event_type
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SyncError::InvalidEvent("missing X-Discourse-Event-Type header".into()))?;
    let event = event
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SyncError::InvalidEvent("missing X-Discourse-Event header".into()))?;

    match (event_type, event) {
        ("post", "post_created") => {
            let envelope: PostEnvelope = decode(body)?;
            let post = envelope.post;
            Ok(Delivery::Content(ContentEvent::PostCreated {
                post_id: post.id.into_string(),
                topic_id: post.topic_id.into_string(),
                username: post.username,
                raw: post.raw,
            }))
        }
        ("chat_message", "chat_message_created") => {
            let envelope: ChatEnvelope = decode(body)?;
            let ChatPayload { message, channel } = envelope.chat_message;
            let channel_id = channel
                .map(|c| c.id)
                .or(message.chat_channel_id)
                .ok_or_else(|| SyncError::InvalidEvent("chat message has no channel id".into()))?;
            Ok(Delivery::Content(ContentEvent::ChatMessageCreated {
                message_id: message.id.into_string(),
                channel_id: channel_id.into_string(),
                username: message.user.username,
                message: message.message,
            }))
        }
        _ => Ok(Delivery::Unsupported {
            event_type: event_type.to_string(),
            event: event.to_string(),
        }),
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, SyncError> {
    serde_json::from_slice(body)
        .map_err(|e| SyncError::InvalidEvent(format!("invalid payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_post_created() {
        let body = br#"{"post":{"id":901,"topic_id":77,"username":"ann","raw":"hello","cooked":"<p>hello</p>"}}"#;
        let delivery = parse_delivery(Some("post"), Some("post_created"), body).unwrap();
        assert_eq!(
            delivery,
            Delivery::Content(ContentEvent::PostCreated {
                post_id: "901".into(),
                topic_id: "77".into(),
                username: "ann".into(),
                raw: "hello".into(),
            })
        );
    }

    #[test]
    fn parses_chat_message_created() {
        let body = br#"{"chat_message":{"message":{"id":31,"message":"hi","user":{"id":4,"username":"bo"}},"channel":{"id":5,"chatable_type":"DirectMessage"}}}"#;
        let delivery =
            parse_delivery(Some("chat_message"), Some("chat_message_created"), body).unwrap();
        assert_eq!(
            delivery,
            Delivery::Content(ContentEvent::ChatMessageCreated {
                message_id: "31".into(),
                channel_id: "5".into(),
                username: "bo".into(),
                message: "hi".into(),
            })
        );
    }

    #[test]
    fn chat_channel_falls_back_to_message_field() {
        let body = br#"{"chat_message":{"message":{"id":"31","message":"hi","user":{"username":"bo"},"chat_channel_id":8}}}"#;
        let Delivery::Content(event) =
            parse_delivery(Some("chat_message"), Some("chat_message_created"), body).unwrap()
        else {
            panic!("expected content event");
        };
        assert_eq!(event.container_id(), "8");
    }

    #[test]
    fn missing_required_field_is_invalid() {
        let body = br#"{"post":{"id":901,"username":"ann","raw":"hello"}}"#;
        let err = parse_delivery(Some("post"), Some("post_created"), body).unwrap_err();
        assert!(matches!(err, SyncError::InvalidEvent(msg) if msg.contains("topic_id")));
    }

    #[test]
    fn missing_headers_are_invalid() {
        assert!(parse_delivery(None, Some("post_created"), b"{}").is_err());
        assert!(parse_delivery(Some("post"), Some("  "), b"{}").is_err());
    }

    #[test]
    fn other_events_are_unsupported_without_parsing_body() {
        let delivery = parse_delivery(Some("post"), Some("post_edited"), b"not json").unwrap();
        assert_eq!(
            delivery,
            Delivery::Unsupported {
                event_type: "post".into(),
                event: "post_edited".into(),
            }
        );
    }
}
