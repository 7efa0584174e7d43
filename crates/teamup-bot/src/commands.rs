//! Chat command parsing and handling.
//!
//! Commands are plain chat messages starting with the configured prefix:
//!
//! - `create_event <name> <required> <duration seconds> <voice channel>`
//! - `cancel_event <event id>`
//! - `list_events`
//!
//! Arguments are separated by spaces; double quotes group an argument that
//! contains spaces (`!create_event "Night Raid" 5 3600 "Raid Voice"`).

use std::fmt::Write as _;
use std::sync::Arc;

use regex::Regex;
use teamup_core::messenger::Messenger;
use teamup_core::service::{CreationError, EventService};
use teamup_types::{ChannelId, CreationRequest, EventId, MessageContent};
use tracing::{debug, info, warn};

use crate::wire::CommandMessage;

/// Name of the event creation command.
const CREATE_EVENT: &str = "create_event";
/// Name of the event cancellation command.
const CANCEL_EVENT: &str = "cancel_event";
/// Name of the active-event listing command.
const LIST_EVENTS: &str = "list_events";

/// Reply when an event with the same identifier already exists.
const DUPLICATE_REPLY: &str = "Failed to create the event. Please try again.";

/// Errors from parsing a command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The tokenizer pattern failed to compile.
    #[error("invalid tokenizer pattern: {source}")]
    Pattern {
        /// The underlying regex error.
        #[from]
        source: regex::Error,
    },

    /// Too few arguments were given.
    #[error("insufficient parameters, usage: {usage}")]
    Usage {
        /// Correct usage of the command.
        usage: String,
    },

    /// A numeric argument did not parse.
    #[error("`{value}` is not a valid {field}")]
    InvalidNumber {
        /// Which argument was wrong.
        field: &'static str,
        /// The text that was given.
        value: String,
    },
}

/// A recognized command with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create and announce a new event.
    CreateEvent {
        /// Event display name.
        name: String,
        /// Headcount that triggers the readiness round.
        required_participants: u32,
        /// Lifetime in seconds, 0 for no expiry.
        duration_seconds: u64,
        /// Voice channel participants are sent to.
        voice_channel_name: String,
    },
    /// Stop an active event early.
    CancelEvent {
        /// The event to stop.
        id: EventId,
    },
    /// List active events.
    ListEvents,
}

/// Splits chat messages into commands.
#[derive(Debug, Clone)]
pub struct CommandParser {
    prefix: String,
    tokenizer: Regex,
}

impl CommandParser {
    /// Build a parser for commands starting with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Pattern`] if the tokenizer fails to compile.
    pub fn new(prefix: &str) -> Result<Self, CommandError> {
        Ok(Self {
            prefix: prefix.to_owned(),
            tokenizer: Regex::new(r#""[^"]+"|[^ ]+"#)?,
        })
    }

    /// Parse a chat message.
    ///
    /// Returns `Ok(None)` for messages that are not one of our commands.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Usage`] for missing arguments and
    /// [`CommandError::InvalidNumber`] for non-numeric counts.
    pub fn parse(&self, text: &str) -> Result<Option<Command>, CommandError> {
        let tokens = self.tokenize(text);
        let Some((head, args)) = tokens.split_first() else {
            return Ok(None);
        };
        let Some(name) = head.strip_prefix(self.prefix.as_str()) else {
            return Ok(None);
        };

        match name {
            CREATE_EVENT => {
                let [name, required, duration, voice, ..] = args else {
                    return Err(self.usage_error(CREATE_EVENT));
                };
                Ok(Some(Command::CreateEvent {
                    name: name.clone(),
                    required_participants: parse_number(required, "participant count")?,
                    duration_seconds: parse_number(duration, "duration in seconds")?,
                    voice_channel_name: voice.clone(),
                }))
            }
            CANCEL_EVENT => {
                let [id, ..] = args else {
                    return Err(self.usage_error(CANCEL_EVENT));
                };
                Ok(Some(Command::CancelEvent {
                    id: parse_number(id, "event id")?,
                }))
            }
            LIST_EVENTS => Ok(Some(Command::ListEvents)),
            _ => Ok(None),
        }
    }

    /// Usage line for a command, including the prefix.
    pub fn usage(&self, command: &str) -> String {
        let args = match command {
            CREATE_EVENT => " EventName RequiredParticipants DurationInSeconds VoiceChannel",
            CANCEL_EVENT => " EventId",
            _ => "",
        };
        format!("{}{command}{args}", self.prefix)
    }

    fn usage_error(&self, command: &str) -> CommandError {
        CommandError::Usage {
            usage: self.usage(command),
        }
    }

    /// Split on spaces, keeping double-quoted runs together without quotes.
    fn tokenize(&self, text: &str) -> Vec<String> {
        self.tokenizer
            .find_iter(text.trim())
            .map(|m| m.as_str().trim_matches('"').to_owned())
            .filter(|token| !token.is_empty())
            .collect()
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, field: &'static str) -> Result<T, CommandError> {
    value.parse().map_err(|_parse| CommandError::InvalidNumber {
        field,
        value: value.to_owned(),
    })
}

/// Executes parsed commands against the event service and replies in chat.
#[derive(Clone)]
pub struct CommandHandler {
    parser: CommandParser,
    service: EventService,
    messenger: Arc<dyn Messenger>,
}

impl CommandHandler {
    /// Create a handler.
    pub fn new(parser: CommandParser, service: EventService, messenger: Arc<dyn Messenger>) -> Self {
        Self {
            parser,
            service,
            messenger,
        }
    }

    /// Handle one chat message. Anything that is not a command is ignored.
    pub async fn handle(&self, message: &CommandMessage) {
        let command = match self.parser.parse(&message.content) {
            Ok(Some(command)) => command,
            Ok(None) => return,
            Err(e) => {
                debug!(author = %message.author, error = %e, "rejected command");
                self.reply(message.channel, &command_error_reply(&e)).await;
                return;
            }
        };

        match command {
            Command::CreateEvent {
                name,
                required_participants,
                duration_seconds,
                voice_channel_name,
            } => {
                let request = CreationRequest {
                    name,
                    required_participants,
                    duration_seconds,
                    voice_channel_name,
                    guild: message.guild,
                    channel: message.channel,
                    requested_by: message.author,
                };
                self.create(&request).await;
            }
            Command::CancelEvent { id } => {
                let text = if self.service.cancel_event(id) {
                    format!("Event {id} has been cancelled.")
                } else {
                    format!("Error: No active event with the id `{id}`.")
                };
                self.reply(message.channel, &text).await;
            }
            Command::ListEvents => {
                self.reply(message.channel, &self.event_list()).await;
            }
        }
    }

    /// Create an event and watch its lifecycle in the background.
    async fn create(&self, request: &CreationRequest) {
        match self.service.create_event(request).await {
            Ok(handle) => {
                tokio::spawn(async move {
                    let id = handle.id();
                    match handle.wait().await {
                        Ok(outcome) => info!(
                            event_id = %outcome.id,
                            phase = %outcome.phase,
                            participants = outcome.participants.len(),
                            readiness_rounds = outcome.readiness_rounds,
                            "event finished"
                        ),
                        Err(e) => warn!(event_id = %id, error = %e, "event task failed"),
                    }
                });
            }
            Err(e) => {
                warn!(name = request.name, error = %e, "event creation failed");
                let text = self.creation_error_reply(&e);
                self.reply(request.channel, &text).await;
            }
        }
    }

    fn creation_error_reply(&self, e: &CreationError) -> String {
        match e {
            CreationError::ChannelNotFound { name } => {
                format!("Error: Voice channel with the name `{name}` not found.")
            }
            CreationError::DuplicateEvent { .. } => DUPLICATE_REPLY.to_owned(),
            CreationError::InsufficientParameters { reason } => format!(
                "Error: Insufficient parameters ({reason}). Use: `{}`",
                self.parser.usage(CREATE_EVENT)
            ),
            CreationError::ChannelLookup { source } | CreationError::Announcement { source } => {
                format!("Error: {source}")
            }
        }
    }

    fn event_list(&self) -> String {
        let events = self.service.registry().summaries();
        if events.is_empty() {
            return "No active events.".to_owned();
        }
        let mut text = String::from("Active events:");
        for (id, summary) in events {
            let _ = write!(
                text,
                "\n- `{id}` **{}** ({} needed, voice channel \"{}\")",
                summary.name, summary.required_participants, summary.voice_destination.name
            );
        }
        text
    }

    async fn reply(&self, channel: ChannelId, text: &str) {
        if let Err(e) = self
            .messenger
            .render_message(channel, &MessageContent::text(text))
            .await
        {
            warn!(channel = %channel, error = %e, "failed to send command reply");
        }
    }
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler")
            .field("parser", &self.parser)
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

/// Chat reply for a command that failed to parse.
fn command_error_reply(e: &CommandError) -> String {
    match e {
        CommandError::Usage { usage } => {
            format!("Error: Insufficient parameters. Use: `{usage}`")
        }
        CommandError::InvalidNumber { field, value } => {
            format!("Error: `{value}` is not a valid {field}.")
        }
        CommandError::Pattern { source } => format!("Error: {source}"),
    }
}
