// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Forumbridge - keeps Google Chat spaces and a Discourse forum in sync.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod doctor;
mod mappings;
mod runtime;
mod serve;
mod status;
mod sync;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use forumbridge_config::ForumbridgeConfig;
use forumbridge_core::MappingKind;

/// Forumbridge - Google Chat to Discourse sync.
#[derive(Parser, Debug)]
#[command(name = "forumbridge", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the initial backfill, periodic catch-up passes and the webhook server.
    Serve,
    /// Run a single sync pass and exit.
    Sync {
        /// Sync only this space (e.g. "spaces/AAAA").
        #[arg(long)]
        space: Option<String>,
    },
    /// List persisted mappings.
    Mappings {
        /// Only this relation (space_category, space_channel, thread_topic,
        /// message_post, message_chat_message, user).
        #[arg(long)]
        kind: Option<MappingKind>,
        /// Output JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Check configuration, storage and platform credentials.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Query a running instance's health endpoint.
    Status {
        /// Output structured JSON.
        #[arg(long)]
        json: bool,
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> ForumbridgeConfig {
    let result = match path {
        Some(path) => forumbridge_config::load_and_validate_path(path),
        None => forumbridge_config::load_and_validate(),
    };
    match result {
        Ok(config) => config,
        Err(errors) => {
            forumbridge_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

/// Commands that talk to both platforms need complete credentials.
fn require_credentials(config: &ForumbridgeConfig) {
    if let Err(errors) = forumbridge_config::validate_credentials(config) {
        forumbridge_config::render_errors(&errors);
        std::process::exit(1);
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    let result = match cli.command {
        Some(Commands::Serve) => {
            require_credentials(&config);
            runtime::init_tracing(&config.service.log_level);
            serve::run_serve(config).await
        }
        Some(Commands::Sync { space }) => {
            require_credentials(&config);
            runtime::init_tracing(&config.service.log_level);
            sync::run_sync(config, space).await
        }
        Some(Commands::Mappings { kind, json }) => {
            mappings::run_mappings(&config, kind, json).await
        }
        Some(Commands::Doctor { plain }) => doctor::run_doctor(&config, plain).await,
        Some(Commands::Status { json, plain }) => status::run_status(&config, json, plain).await,
        None => {
            println!("forumbridge: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_sync_with_space() {
        let cli = Cli::parse_from(["forumbridge", "sync", "--space", "spaces/AAA"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Sync { space: Some(ref s) }) if s == "spaces/AAA"
        ));
    }

    #[test]
    fn cli_parses_mapping_kind() {
        let cli = Cli::parse_from(["forumbridge", "mappings", "--kind", "thread_topic"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Mappings {
                kind: Some(MappingKind::ThreadTopic),
                json: false
            })
        ));
    }

    #[test]
    fn cli_rejects_unknown_mapping_kind() {
        assert!(Cli::try_parse_from(["forumbridge", "mappings", "--kind", "reactions"]).is_err());
    }

    #[test]
    fn cli_accepts_global_config_flag() {
        let cli = Cli::parse_from(["forumbridge", "doctor", "--config", "/tmp/fb.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/fb.toml")));
    }
}
