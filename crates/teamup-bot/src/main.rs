//! `TeamUp` bot binary.
//!
//! Wires configuration, logging, the NATS gateway messenger and the event
//! service together, then feeds chat commands from the gateway into the
//! command handler until interrupted.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `teamup.yaml` (or `TEAMUP_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Connect to NATS and build the gateway messenger
//! 4. Create the event registry and service
//! 5. Subscribe to incoming commands and dispatch them
//! 6. On Ctrl-C, cancel every event and wait for them to wind down

mod commands;
mod error;
mod gateway;
mod wire;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt as _;
use teamup_core::config::{BotConfig, LogFormat, LoggingConfig};
use teamup_core::messenger::Messenger;
use teamup_core::registry::EventRegistry;
use teamup_core::service::EventService;
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::commands::{CommandHandler, CommandParser};
use crate::error::BotError;
use crate::gateway::GatewayMessenger;
use crate::wire::{CommandMessage, commands_subject};

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "teamup.yaml";

/// How long cancelled events get to render their final state on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Application entry point for the bot.
///
/// # Errors
///
/// Returns an error if configuration, the NATS connection or the command
/// subscription fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, config_source) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!("teamup-bot starting");
    info!(
        source = config_source,
        poll_interval_ms = config.timing.poll_interval_ms,
        readiness_window_ms = config.timing.readiness_window_ms,
        command_prefix = config.bot.command_prefix,
        subject_prefix = config.infrastructure.subject_prefix,
        "Configuration loaded"
    );

    // 3. Connect to NATS.
    let nats_url = &config.infrastructure.nats_url;
    info!(nats_url = nats_url, "Connecting to NATS");
    let client = async_nats::connect(nats_url)
        .await
        .map_err(|e| BotError::Nats {
            message: format!("failed to connect to {nats_url}: {e}"),
        })?;
    let messenger: Arc<dyn Messenger> = Arc::new(GatewayMessenger::new(
        client.clone(),
        &config.infrastructure.subject_prefix,
        config.infrastructure.gateway_timeout(),
    ));
    info!("NATS gateway messenger connected");

    // 4. Create the registry and service.
    let registry = Arc::new(EventRegistry::new());
    let service = EventService::new(
        Arc::clone(&registry),
        Arc::clone(&messenger),
        config.timing.clone(),
    );
    let parser = CommandParser::new(&config.bot.command_prefix).map_err(BotError::from)?;
    let handler = CommandHandler::new(parser, service.clone(), messenger);

    // 5. Dispatch commands.
    let subject = commands_subject(&config.infrastructure.subject_prefix);
    let mut commands = client
        .subscribe(subject.clone())
        .await
        .map_err(|e| BotError::Nats {
            message: format!("failed to subscribe to {subject}: {e}"),
        })?;
    info!(subject = subject, "Listening for commands");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            signal = &mut shutdown => {
                signal.map_err(BotError::from)?;
                info!("Shutdown signal received");
                break;
            }
            next = commands.next() => {
                let Some(message) = next else {
                    warn!(subject = subject, "command subscription closed");
                    break;
                };
                match serde_json::from_slice::<CommandMessage>(&message.payload) {
                    Ok(command) => {
                        let handler = handler.clone();
                        tokio::spawn(async move { handler.handle(&command).await });
                    }
                    Err(e) => warn!(error = %e, "failed to deserialize command message"),
                }
            }
        }
    }

    // 6. Wind down.
    service.shutdown();
    let drained = drain(&registry, config.timing.poll_interval()).await;
    info!(
        remaining_events = registry.len(),
        drained = drained,
        "teamup-bot shutdown complete"
    );

    Ok(())
}

/// Load `TEAMUP_CONFIG` or `teamup.yaml`, falling back to defaults plus
/// environment overrides when the file does not exist.
fn load_config() -> Result<(BotConfig, String), BotError> {
    let path = std::env::var_os("TEAMUP_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if path.exists() {
        let config = BotConfig::from_file(&path)?;
        Ok((config, path.display().to_string()))
    } else {
        Ok((BotConfig::from_env()?, "defaults".to_owned()))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `logging.level`.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}

/// Wait until every event has left the registry or the grace period ends.
///
/// Returns whether the registry drained.
async fn drain(registry: &EventRegistry, poll: Duration) -> bool {
    let deadline = Instant::now()
        .checked_add(SHUTDOWN_GRACE)
        .unwrap_or_else(Instant::now);
    while !registry.is_empty() {
        if Instant::now() >= deadline {
            warn!(remaining_events = registry.len(), "events still active after grace period");
            return false;
        }
        tokio::time::sleep(poll.min(SHUTDOWN_GRACE)).await;
    }
    true
}
