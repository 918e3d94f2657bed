// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Charla - human-agent console for a WhatsApp conversational bot.
//!
//! This is the binary entry point for the Charla console.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use charla_backend::HttpBackend;
use charla_config::CharlaConfig;
use charla_core::error::CharlaError;
use charla_core::types::ConversationMode;
use charla_engine::SyncEngine;

mod contacts;
mod mode;
mod send;
mod watch;

/// Charla - human-agent console for a WhatsApp conversational bot.
#[derive(Parser, Debug)]
#[command(name = "charla", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// List the most recent lead conversations.
    Contacts,
    /// Watch a conversation live, printing new messages as they arrive.
    Watch {
        /// Conversation id (the lead's WhatsApp number).
        conversation_id: String,
    },
    /// Switch a conversation between bot and agent control.
    Mode {
        /// Conversation id (the lead's WhatsApp number).
        conversation_id: String,
        /// Target mode: "bot" or "agent".
        mode: ConversationMode,
    },
    /// Send a human-agent reply into a conversation.
    Send {
        /// Conversation id (the lead's WhatsApp number).
        conversation_id: String,
        /// The message text.
        message: String,
    },
}

/// Build the sync engine over the configured HTTP backend.
fn build_engine(config: CharlaConfig) -> Result<SyncEngine, CharlaError> {
    let backend = Arc::new(HttpBackend::new(config.backend.clone())?);
    Ok(SyncEngine::new(backend, config))
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("charla={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match charla_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            charla_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    init_tracing(&config.console.log_level);

    let result = match cli.command {
        Some(Commands::Contacts) => contacts::run_contacts(config).await,
        Some(Commands::Watch { conversation_id }) => {
            watch::run_watch(config, conversation_id).await
        }
        Some(Commands::Mode {
            conversation_id,
            mode,
        }) => mode::run_mode(config, conversation_id, mode).await,
        Some(Commands::Send {
            conversation_id,
            message,
        }) => send::run_send(config, conversation_id, message).await,
        None => {
            println!("charla: use --help for available commands");
            Ok(())
        }
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Verify jemalloc is the global allocator by advancing the epoch.
        // Only jemalloc supports this -- the system allocator would fail.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_the_watch_subcommand() {
        use clap::Parser;
        let cli = super::Cli::parse_from(["charla", "watch", "5215550001"]);
        match cli.command {
            Some(super::Commands::Watch { conversation_id }) => {
                assert_eq!(conversation_id, "5215550001");
            }
            other => panic!("expected watch, got {other:?}"),
        }
    }

    #[test]
    fn cli_rejects_an_unknown_mode() {
        use clap::Parser;
        let result = super::Cli::try_parse_from(["charla", "mode", "5215550001", "human"]);
        assert!(result.is_err());
    }
}
