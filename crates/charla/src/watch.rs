// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `charla watch` command implementation.
//!
//! Activates a conversation, prints its history, then follows engine
//! events until Ctrl+C: new messages, directory badges, mode flips, and
//! the halt notice when the credential expires.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use charla_config::CharlaConfig;
use charla_core::error::CharlaError;
use charla_core::types::ConversationId;
use charla_engine::{EngineEvent, NotificationKind, PollScope};

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal
/// is received.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), closing the console");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, closing the console");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, closing the console");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Watch a conversation live until interrupted.
pub async fn run_watch(config: CharlaConfig, conversation_id: String) -> Result<(), CharlaError> {
    let engine = crate::build_engine(config)?;
    let conversation = ConversationId(conversation_id);

    // Seed the directory first so the summary and mode are known; a
    // failure here is not fatal for watching a single conversation.
    if let Err(err) = engine.load_recent_contacts().await {
        warn!(error = %err, "directory load failed, watching without it");
    }

    let known = engine
        .contacts()
        .await
        .into_iter()
        .find(|c| c.id == conversation);
    let mut events = engine.subscribe();
    engine.activate(&conversation, known.as_ref()).await?;

    let history = engine.messages(&conversation).await;
    println!(
        "— {} ({} mensajes, modo {}) —",
        conversation,
        history.len(),
        engine.mode(&conversation).await,
    );
    for message in &history {
        println!("{} {}  {}", message.date_label, message.time_label, message.text);
    }

    let mut printed = history.len();
    let cancel = install_signal_handler();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Ok(EngineEvent::MessagesAppended { conversation: id, .. }) if id == conversation => {
                    let messages = engine.messages(&conversation).await;
                    for message in messages.iter().skip(printed) {
                        println!(
                            "{} {}  {}",
                            message.date_label, message.time_label, message.text
                        );
                    }
                    printed = messages.len();
                }
                Ok(EngineEvent::ModeChanged { conversation: id, mode }) if id == conversation => {
                    println!("— modo cambiado a {mode} —");
                }
                Ok(EngineEvent::ContactNotification { conversation: id, kind }) => {
                    match kind {
                        NotificationKind::NewContact => {
                            println!("• nueva conversación: {id}");
                        }
                        NotificationKind::UpdatedContact => {
                            println!("• conversación actualizada: {id}");
                        }
                    }
                }
                Ok(EngineEvent::PollingHalted { scope }) => {
                    let family = match scope {
                        PollScope::Messages => "mensajes",
                        PollScope::Contacts => "contactos",
                    };
                    println!("— sesión expirada, sondeo de {family} detenido —");
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "event receiver lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    engine.clear_all().await;
    info!("watch session closed");
    Ok(())
}
