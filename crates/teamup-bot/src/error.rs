//! Error types for the bot binary.
//!
//! [`BotError`] is the top-level error that `main` propagates with `?`.

/// Top-level error for the bot binary.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: teamup_core::config::ConfigError,
    },

    /// The command parser could not be built.
    #[error("command error: {source}")]
    Command {
        /// The underlying command error.
        #[from]
        source: crate::commands::CommandError,
    },

    /// NATS connection or subscription failed.
    #[error("NATS error: {message}")]
    Nats {
        /// Description of the NATS failure.
        message: String,
    },

    /// Waiting for the shutdown signal failed.
    #[error("signal error: {source}")]
    Signal {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}
