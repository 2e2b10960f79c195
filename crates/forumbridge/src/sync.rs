// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `forumbridge sync` command implementation: one pass, then exit.

use forumbridge_config::ForumbridgeConfig;
use forumbridge_core::SyncError;
use forumbridge_engine::{PassReport, install_signal_handler};

use crate::runtime::Runtime;

/// Runs a single pass over all spaces, or over `space` alone.
pub async fn run_sync(config: ForumbridgeConfig, space: Option<String>) -> Result<(), SyncError> {
    let runtime = Runtime::assemble(&config).await?;
    let cancel = install_signal_handler();

    let result = match space {
        Some(space_id) => runtime
            .engine
            .sync_space(&space_id, &cancel)
            .await
            .map(|report| PassReport {
                spaces: vec![report],
                failures: Vec::new(),
            }),
        None => runtime.engine.run_pass(&cancel).await,
    };
    runtime.close().await?;

    let report = result?;
    print_report(&report);
    if report.failures.is_empty() {
        Ok(())
    } else {
        Err(SyncError::Internal(format!(
            "{} space(s) failed to sync",
            report.failures.len()
        )))
    }
}

fn print_report(report: &PassReport) {
    println!();
    println!("  forumbridge sync");
    println!("  {}", "-".repeat(50));
    for space in &report.spaces {
        let state = if space.inactive {
            "inactive".to_string()
        } else if space.cancelled {
            "cancelled".to_string()
        } else {
            space.kind.map(|k| k.to_string()).unwrap_or_default()
        };
        println!(
            "    {:<28} {:<9} created={} skipped={} failed={}",
            space.space_id, state, space.created, space.skipped, space.failed
        );
    }
    for failure in &report.failures {
        println!("    {:<28} FAILED    {}", failure.space_id, failure.error);
    }
    println!();
}
