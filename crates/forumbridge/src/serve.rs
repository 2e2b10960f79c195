// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `forumbridge serve` command implementation.
//!
//! Runs the initial backfill, then a catch-up pass every
//! `service.poll_interval_secs`, alongside the webhook gateway when enabled.
//! Both stop on SIGINT/SIGTERM; the store is checkpointed on the way out.

use std::sync::Arc;
use std::time::Duration;

use forumbridge_config::ForumbridgeConfig;
use forumbridge_core::{ContentEventHandler, SyncError};
use forumbridge_engine::{SyncEngine, install_signal_handler};
use forumbridge_gateway::{GatewayState, ServerConfig, WebhookAuth};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::runtime::Runtime;

/// Runs the `forumbridge serve` command.
pub async fn run_serve(config: ForumbridgeConfig) -> Result<(), SyncError> {
    info!("starting forumbridge serve");

    let runtime = Runtime::assemble(&config).await?;
    let cancel = install_signal_handler();

    let gateway = if config.gateway.enabled {
        let server_config = ServerConfig {
            host: config.gateway.host.clone(),
            port: config.gateway.port,
        };
        let handler: Arc<dyn ContentEventHandler> = runtime.engine.clone();
        let state = GatewayState::new(
            handler,
            WebhookAuth {
                secret: config.gateway.webhook_secret.clone(),
            },
        );
        if state.auth.secret.is_none() {
            warn!("gateway.webhook_secret is not set; webhook deliveries are not authenticated");
        }
        let cancel = cancel.clone();
        Some(tokio::spawn(async move {
            let served =
                forumbridge_gateway::start_server(&server_config, state, cancel.clone()).await;
            if let Err(e) = served {
                error!(error = %e, "webhook gateway failed, shutting down");
                cancel.cancel();
            }
        }))
    } else {
        info!("webhook gateway disabled; destination content will not reach the origin");
        None
    };

    let poll = Duration::from_secs(config.service.poll_interval_secs.max(1));
    poll_loop(&runtime.engine, poll, &cancel).await;

    if let Some(handle) = gateway
        && let Err(e) = handle.await
    {
        warn!(error = %e, "webhook gateway task ended abnormally");
    }

    runtime.close().await?;
    info!("forumbridge serve shutdown complete");
    Ok(())
}

/// Runs a pass on every tick until cancelled.
///
/// The first tick fires immediately and is the backfill. A pass that runs
/// past the interval delays the next tick, so passes never overlap.
async fn poll_loop(engine: &SyncEngine, every: Duration, cancel: &CancellationToken) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut first = true;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let label = if first { "initial backfill" } else { "catch-up pass" };
                first = false;
                match engine.run_pass(cancel).await {
                    Ok(report) => info!(
                        pass = label,
                        spaces = report.spaces.len(),
                        failed_spaces = report.failures.len(),
                        created = report.created(),
                        "pass finished"
                    ),
                    // Pass-scope failures (revoked credentials, store errors)
                    // are retried on the next tick.
                    Err(e) => error!(pass = label, error = %e, "pass aborted"),
                }
            }
        }
    }
    info!("sync loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use forumbridge_test_utils::{MockSource, TestHarness, human, message_at};

    #[tokio::test]
    async fn poll_loop_backfills_then_stops_on_cancel() {
        let source = MockSource::new().with_space("spaces/AAA", "General", "SPACE");
        let ann = human("users/1", "Ann Lee");
        source.push(message_at(
            "spaces/AAA/messages/1",
            "spaces/AAA",
            Some("spaces/AAA/threads/t1"),
            &ann,
            "hello",
            1,
        ));
        let harness = TestHarness::builder()
            .with_source(source)
            .with_binding("spaces/AAA")
            .build()
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        let stopper = {
            let cancel = cancel.clone();
            let destination = harness.destination.clone();
            tokio::spawn(async move {
                for _ in 0..500 {
                    if !destination.topics().await.is_empty() {
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
                cancel.cancel();
            })
        };
        poll_loop(&harness.engine, Duration::from_millis(20), &cancel).await;
        stopper.await.unwrap();

        assert_eq!(harness.destination.topics().await.len(), 1);
        // Opening post only; later passes must not repeat it.
        assert_eq!(harness.destination.posts().await.len(), 1);
    }
}
