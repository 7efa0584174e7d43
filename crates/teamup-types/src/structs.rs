//! Message, interaction and request structs exchanged with the messaging
//! collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{ChannelKind, ControlStyle};
use crate::ids::{ChannelId, GuildId, MessageId, UserId};

/// An interactive control (button) attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    /// Identifier reported back in an [`Interaction`] when pressed.
    pub id: String,
    /// Text shown on the control.
    pub label: String,
    /// Visual style.
    pub style: ControlStyle,
}

impl Control {
    /// Build a control from its parts.
    pub fn new(id: impl Into<String>, label: impl Into<String>, style: ControlStyle) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            style,
        }
    }
}

/// Text plus controls making up a rendered message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
    /// Message body.
    pub text: String,
    /// Controls rendered under the body, in display order.
    #[serde(default)]
    pub controls: Vec<Control>,
}

impl MessageContent {
    /// Plain text with no controls.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            controls: Vec::new(),
        }
    }

    /// Text with the given controls.
    pub fn with_controls(text: impl Into<String>, controls: Vec<Control>) -> Self {
        Self {
            text: text.into(),
            controls,
        }
    }
}

/// Reference to a posted message that can be edited or deleted later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageHandle {
    /// Channel the message lives in.
    pub channel: ChannelId,
    /// The message itself.
    pub message: MessageId,
}

/// A control press reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    /// Platform token used to acknowledge the interaction.
    pub token: String,
    /// Message whose control was pressed.
    pub message: MessageId,
    /// Identifier of the pressed control.
    pub control_id: String,
    /// User who pressed it.
    pub user: UserId,
}

/// How an interaction is acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "text")]
pub enum Acknowledgement {
    /// Silent acknowledgement; the message is updated separately.
    DeferredUpdate,
    /// Reply shown to the pressing user.
    Reply(String),
}

/// A resolved platform channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Channel identifier.
    pub id: ChannelId,
    /// Display name.
    pub name: String,
    /// Channel kind.
    pub kind: ChannelKind,
}

/// A guild member as shown in an event roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// User identifier; the identity used for roster membership.
    pub id: UserId,
    /// Name shown in roster listings and notices.
    pub display_name: String,
}

impl Member {
    /// Build a member from its parts.
    pub fn new(id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

/// Request to create an event, produced by the command handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreationRequest {
    /// Event display name.
    pub name: String,
    /// Headcount needed before the readiness round starts.
    pub required_participants: u32,
    /// Lifetime in seconds; 0 means the event never expires on its own.
    pub duration_seconds: u64,
    /// Name of the voice channel participants are sent to.
    pub voice_channel_name: String,
    /// Guild the command was issued in.
    pub guild: GuildId,
    /// Channel the announcement is posted to.
    pub channel: ChannelId,
    /// User who issued the command.
    pub requested_by: UserId,
}

/// Read-only summary of an active event, served to external responders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    /// Event display name.
    pub name: String,
    /// Headcount needed before the readiness round starts.
    pub required_participants: u32,
    /// Voice destination resolved at creation time.
    pub voice_destination: Channel,
    /// The announcement message.
    pub announcement: MessageHandle,
    /// Wall-clock creation time.
    pub created_at: DateTime<Utc>,
}
