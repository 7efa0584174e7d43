//! The messaging collaborator the lifecycle talks to.
//!
//! [`Messenger`] is the narrow capability set the core needs from a chat
//! platform: post and edit messages, wait for control presses, reach users
//! privately, and resolve channels and members. The bot binary implements it
//! over a NATS gateway; [`InMemoryMessenger`] implements it for tests and
//! local runs.
//!
//! [`InMemoryMessenger`]: crate::memory::InMemoryMessenger

use std::time::Duration;

use async_trait::async_trait;
use teamup_types::{
    Acknowledgement, Channel, ChannelId, ChannelKind, GuildId, Interaction, Member, MessageContent,
    MessageHandle, UserId,
};

/// Errors reported by a [`Messenger`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    /// The platform could not deliver a private message to the user.
    #[error("cannot reach user {user} privately: {message}")]
    Unreachable {
        /// The user that could not be reached.
        user: UserId,
        /// Description of the failure.
        message: String,
    },

    /// The referenced message does not exist (or was deleted).
    #[error("message {handle:?} not found")]
    UnknownMessage {
        /// The stale handle.
        handle: MessageHandle,
    },

    /// The user is not a member of the guild.
    #[error("user {user} is not a member of guild {guild}")]
    UnknownMember {
        /// Guild that was searched.
        guild: GuildId,
        /// User that was not found.
        user: UserId,
    },

    /// The platform or its transport failed.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Capability set consumed from the chat platform.
///
/// All methods take `&self`; implementations are shared between every
/// lifecycle task through an `Arc<dyn Messenger>`.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Post a new message with optional controls to a channel.
    async fn render_message(
        &self,
        channel: ChannelId,
        content: &MessageContent,
    ) -> Result<MessageHandle, MessagingError>;

    /// Replace the text and controls of an existing message.
    async fn edit_message(
        &self,
        handle: &MessageHandle,
        content: &MessageContent,
    ) -> Result<(), MessagingError>;

    /// Delete a message.
    async fn delete_message(&self, handle: &MessageHandle) -> Result<(), MessagingError>;

    /// Wait up to `timeout` for the next control press on `handle`.
    ///
    /// Returns `Ok(None)` when the wait times out; that is the ordinary idle
    /// outcome, not an error.
    async fn await_next_interaction(
        &self,
        handle: &MessageHandle,
        timeout: Duration,
    ) -> Result<Option<Interaction>, MessagingError>;

    /// Acknowledge an interaction so the platform does not report it as
    /// failed.
    async fn acknowledge_interaction(
        &self,
        interaction: &Interaction,
        acknowledgement: Acknowledgement,
    ) -> Result<(), MessagingError>;

    /// Open (or reuse) the direct-message channel with a user.
    async fn open_private_channel(&self, user: UserId) -> Result<ChannelId, MessagingError>;

    /// Send a message to a channel, typically a private one.
    async fn send_message(
        &self,
        channel: ChannelId,
        content: &MessageContent,
    ) -> Result<MessageHandle, MessagingError>;

    /// Find a guild channel by exact name and kind.
    async fn resolve_channel_by_name(
        &self,
        guild: GuildId,
        name: &str,
        kind: ChannelKind,
    ) -> Result<Option<Channel>, MessagingError>;

    /// Look up a guild member's display name.
    async fn resolve_member(&self, guild: GuildId, user: UserId) -> Result<Member, MessagingError>;

    /// Stop delivering interactions for a message whose event has ended.
    async fn close_interactions(&self, _handle: &MessageHandle) {}
}
