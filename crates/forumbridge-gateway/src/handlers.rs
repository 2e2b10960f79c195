// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway.
//!
//! Handles POST /discourse-webhook and GET /health.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::auth::SIGNATURE_HEADER;
use crate::payload::{Delivery, EVENT_HEADER, EVENT_TYPE_HEADER, parse_delivery};
use crate::server::GatewayState;

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Response body for deliveries that are well-formed but not propagated.
#[derive(Debug, Serialize)]
pub struct SkippedResponse {
    pub outcome: &'static str,
    pub event: String,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// POST /discourse-webhook
///
/// Verifies the signature over the raw body, validates the delivery, and
/// hands content events to the engine. Propagation failures are reported in
/// the outcome body with a 200 so Discourse does not redeliver.
pub async fn post_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !state.auth.verify(&body, header(&headers, SIGNATURE_HEADER)) {
        tracing::warn!("webhook delivery rejected: bad or missing signature");
        return error(StatusCode::UNAUTHORIZED, "invalid webhook signature");
    }

    let delivery = match parse_delivery(
        header(&headers, EVENT_TYPE_HEADER),
        header(&headers, EVENT_HEADER),
        &body,
    ) {
        Ok(delivery) => delivery,
        Err(e) => {
            tracing::warn!(error = %e, "webhook delivery rejected");
            return error(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    match delivery {
        Delivery::Unsupported { event_type, event } => {
            tracing::debug!(%event_type, %event, "ignoring unsupported webhook event");
            Json(SkippedResponse {
                outcome: "skipped",
                event,
            })
            .into_response()
        }
        Delivery::Content(event) => {
            tracing::debug!(
                entity_id = event.entity_id(),
                container_id = event.container_id(),
                author = event.author(),
                "webhook content event"
            );
            let outcome = state.handler.on_content_created(&event).await;
            Json(outcome).into_response()
        }
    }
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use forumbridge_core::{ContentEvent, EventOutcome, IgnoreReason};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::{WebhookAuth, sign};
    use crate::server::router;
    use crate::testing::RecordingHandler;

    const POST_BODY: &str =
        r#"{"post":{"id":901,"topic_id":77,"username":"ann","raw":"hello from the forum"}}"#;

    fn state(handler: Arc<RecordingHandler>, secret: Option<&str>) -> GatewayState {
        GatewayState::new(
            handler,
            WebhookAuth {
                secret: secret.map(str::to_string),
            },
        )
    }

    fn delivery(event_type: &str, event: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/discourse-webhook")
            .header("content-type", "application/json")
            .header("X-Discourse-Event-Type", event_type)
            .header("X-Discourse-Event", event)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn post_created_reaches_handler() {
        let handler = Arc::new(RecordingHandler::default());
        let app = router(state(handler.clone(), None));

        let response = app
            .oneshot(delivery("post", "post_created", POST_BODY))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["outcome"], "accepted");
        assert_eq!(body["origin_message_id"], "spaces/AAA/messages/m1");
        assert_eq!(
            handler.events(),
            vec![ContentEvent::PostCreated {
                post_id: "901".into(),
                topic_id: "77".into(),
                username: "ann".into(),
                raw: "hello from the forum".into(),
            }]
        );
    }

    #[tokio::test]
    async fn ignored_outcome_is_still_ok() {
        let handler = Arc::new(RecordingHandler::answering(EventOutcome::ignored(
            IgnoreReason::SelfOrigin,
        )));
        let app = router(state(handler, None));

        let response = app
            .oneshot(delivery("post", "post_created", POST_BODY))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["outcome"], "ignored");
        assert_eq!(body["reason"], "self_origin");
    }

    #[tokio::test]
    async fn missing_field_is_bad_request() {
        let handler = Arc::new(RecordingHandler::default());
        let app = router(state(handler.clone(), None));

        let response = app
            .oneshot(delivery(
                "chat_message",
                "chat_message_created",
                r#"{"chat_message":{"message":{"id":3,"message":"hi"},"channel":{"id":5}}}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(handler.events().is_empty());
    }

    #[tokio::test]
    async fn unsupported_event_is_skipped() {
        let handler = Arc::new(RecordingHandler::default());
        let app = router(state(handler.clone(), None));

        let response = app
            .oneshot(delivery("topic", "topic_created", "{}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["outcome"], "skipped");
        assert_eq!(body["event"], "topic_created");
        assert!(handler.events().is_empty());
    }

    #[tokio::test]
    async fn signature_required_when_secret_set() {
        let handler = Arc::new(RecordingHandler::default());
        let app = router(state(handler.clone(), Some("s3cret")));

        let response = app
            .oneshot(delivery("post", "post_created", POST_BODY))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(handler.events().is_empty());
    }

    #[tokio::test]
    async fn valid_signature_is_accepted() {
        let handler = Arc::new(RecordingHandler::default());
        let app = router(state(handler.clone(), Some("s3cret")));

        let mut request = delivery("post", "post_created", POST_BODY);
        let signature = sign("s3cret", POST_BODY.as_bytes()).unwrap();
        request
            .headers_mut()
            .insert(SIGNATURE_HEADER, signature.parse().unwrap());

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(handler.events().len(), 1);
    }

    #[tokio::test]
    async fn health_reports_version() {
        let app = router(state(Arc::new(RecordingHandler::default()), Some("s3cret")));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}
