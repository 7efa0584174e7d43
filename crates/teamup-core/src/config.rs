//! Configuration loading and typed config structures for the bot.
//!
//! The canonical configuration lives in `teamup.yaml`. This module defines
//! strongly-typed structs that mirror the YAML structure, a loader that reads
//! and validates the file, and environment overrides for deployment.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is outside its allowed range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level bot configuration.
///
/// Mirrors the structure of `teamup.yaml`. Every section is optional and
/// falls back to the defaults below.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BotConfig {
    /// Lifecycle timing.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Command surface settings.
    #[serde(default)]
    pub bot: CommandConfig,

    /// Infrastructure connection strings.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BotConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `NATS_URL` overrides `infrastructure.nats_url`
    /// - `TEAMUP_POLL_INTERVAL_MS` overrides `timing.poll_interval_ms`
    /// - `TEAMUP_READINESS_WINDOW_MS` overrides `timing.readiness_window_ms`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply environment
    /// overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for runs without a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if an override is malformed or out
    /// of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Override values with environment variables when set.
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(&|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its
    /// value.
    fn apply_overrides(
        &mut self,
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        self.infrastructure.apply_overrides(lookup);
        if let Some(ms) = parse_millis("TEAMUP_POLL_INTERVAL_MS", lookup)? {
            self.timing.poll_interval_ms = ms;
        }
        if let Some(ms) = parse_millis("TEAMUP_READINESS_WINDOW_MS", lookup)? {
            self.timing.readiness_window_ms = ms;
        }
        Ok(())
    }

    /// Reject values the lifecycle cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for zero intervals or timeouts, or
    /// an empty command prefix.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timing.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                reason: "timing.poll_interval_ms must be at least 1".to_owned(),
            });
        }
        if self.timing.readiness_window_ms == 0 {
            return Err(ConfigError::Invalid {
                reason: "timing.readiness_window_ms must be at least 1".to_owned(),
            });
        }
        if self.infrastructure.gateway_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                reason: "infrastructure.gateway_timeout_ms must be at least 1".to_owned(),
            });
        }
        if self.bot.command_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid {
                reason: "bot.command_prefix must not be empty".to_owned(),
            });
        }
        Ok(())
    }
}

/// Read an optional millisecond value through `lookup`.
fn parse_millis(
    name: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<Option<u64>, ConfigError> {
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::Invalid {
                    reason: format!("invalid {name}: {e}"),
                })
        })
        .transpose()
}

/// Lifecycle timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimingConfig {
    /// Upper bound on a single interaction wait, so expiry is re-checked
    /// promptly.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long each participant has to confirm readiness.
    #[serde(default = "default_readiness_window_ms")]
    pub readiness_window_ms: u64,
}

impl TimingConfig {
    /// The poll interval as a [`Duration`].
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// The readiness window as a [`Duration`].
    pub const fn readiness_window(&self) -> Duration {
        Duration::from_millis(self.readiness_window_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            readiness_window_ms: default_readiness_window_ms(),
        }
    }
}

/// Command surface settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandConfig {
    /// Prefix that marks a chat message as a bot command.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            command_prefix: default_command_prefix(),
        }
    }
}

/// Infrastructure connection strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// NATS messaging URL used to reach the platform gateway.
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// Root of every NATS subject the bot publishes or subscribes to.
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,

    /// Timeout for a single gateway request/reply round trip.
    #[serde(default = "default_gateway_timeout_ms")]
    pub gateway_timeout_ms: u64,
}

impl InfrastructureConfig {
    /// Override infrastructure URLs when `lookup` has `NATS_URL`.
    pub fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("NATS_URL") {
            self.nats_url = val;
        }
    }

    /// The gateway timeout as a [`Duration`].
    pub const fn gateway_timeout(&self) -> Duration {
        Duration::from_millis(self.gateway_timeout_ms)
    }
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            nats_url: default_nats_url(),
            subject_prefix: default_subject_prefix(),
            gateway_timeout_ms: default_gateway_timeout_ms(),
        }
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error), used when
    /// `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

const fn default_poll_interval_ms() -> u64 {
    1_000
}

const fn default_readiness_window_ms() -> u64 {
    10_000
}

fn default_command_prefix() -> String {
    "!".to_owned()
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_owned()
}

fn default_subject_prefix() -> String {
    "teamup".to_owned()
}

const fn default_gateway_timeout_ms() -> u64 {
    5_000
}

fn default_log_level() -> String {
    "info".to_owned()
}
