// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the webhook endpoint.

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use forumbridge_core::{ContentEventHandler, SyncError};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::auth::WebhookAuth;
use crate::handlers;

/// Discourse payloads are small JSON documents; anything larger is refused.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Health state for the unauthenticated health endpoint.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            start_time: std::time::Instant::now(),
        }
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Receiver of validated content events.
    pub handler: Arc<dyn ContentEventHandler>,
    /// Webhook signature verification.
    pub auth: WebhookAuth,
    pub health: HealthState,
}

impl GatewayState {
    pub fn new(handler: Arc<dyn ContentEventHandler>, auth: WebhookAuth) -> Self {
        Self {
            handler,
            auth,
            health: HealthState::default(),
        }
    }
}

/// Gateway server configuration (mirrors GatewayConfig from forumbridge-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Builds the gateway router.
///
/// - POST /discourse-webhook (signature-verified when a secret is set)
/// - GET /health (unauthenticated)
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/discourse-webhook", post(handlers::post_webhook))
        .route("/health", get(handlers::get_health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds to `host:port` and serves until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), SyncError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SyncError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!(%addr, "webhook gateway listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| SyncError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("webhook gateway stopped");
    Ok(())
}
