//! JSON payloads exchanged with the platform gateway over NATS.
//!
//! # Subject Convention
//!
//! - **Commands in:** `{prefix}.commands` carries [`CommandMessage`]s.
//! - **Gateway calls:** `{prefix}.gateway.{operation}` request/reply, the
//!   request body is one of the structs below and the reply is a
//!   [`GatewayReply`].
//! - **Interactions in:** `{prefix}.interactions.{message_id}` carries
//!   [`Interaction`](teamup_types::Interaction)s for one message.

use serde::{Deserialize, Serialize};
use teamup_types::{
    Acknowledgement, ChannelId, ChannelKind, GuildId, Interaction, MessageContent, MessageHandle,
    MessageId, UserId,
};

/// A chat message forwarded by the gateway for command handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMessage {
    /// Guild the message was posted in.
    pub guild: GuildId,
    /// Channel the message was posted in; replies go here.
    pub channel: ChannelId,
    /// Author of the message.
    pub author: UserId,
    /// Raw message text.
    pub content: String,
}

/// Reply to a gateway request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayReply<T> {
    /// The operation succeeded with a value.
    Ok(T),
    /// The operation failed; the text describes why.
    Err(String),
}

/// Body of `render_message` and `send_message`.
#[derive(Debug, Serialize)]
pub struct PostRequest<'a> {
    /// Target channel.
    pub channel: ChannelId,
    /// Message text and controls.
    pub content: &'a MessageContent,
}

/// Body of `edit_message`.
#[derive(Debug, Serialize)]
pub struct EditRequest<'a> {
    /// Message to edit.
    pub handle: &'a MessageHandle,
    /// Replacement text and controls.
    pub content: &'a MessageContent,
}

/// Body of `delete_message`.
#[derive(Debug, Serialize)]
pub struct DeleteRequest<'a> {
    /// Message to delete.
    pub handle: &'a MessageHandle,
}

/// Body of `acknowledge_interaction`.
#[derive(Debug, Serialize)]
pub struct AcknowledgeRequest<'a> {
    /// The interaction being answered.
    pub interaction: &'a Interaction,
    /// How to answer it.
    pub acknowledgement: &'a Acknowledgement,
}

/// Body of `open_private_channel`.
#[derive(Debug, Serialize)]
pub struct PrivateChannelRequest {
    /// User to reach.
    pub user: UserId,
}

/// Body of `resolve_channel_by_name`.
#[derive(Debug, Serialize)]
pub struct ChannelLookupRequest<'a> {
    /// Guild to search.
    pub guild: GuildId,
    /// Exact channel name.
    pub name: &'a str,
    /// Required channel kind.
    pub kind: ChannelKind,
}

/// Body of `resolve_member`.
#[derive(Debug, Serialize)]
pub struct MemberLookupRequest {
    /// Guild to search.
    pub guild: GuildId,
    /// User to resolve.
    pub user: UserId,
}

/// Subject for a gateway operation.
pub fn gateway_subject(prefix: &str, operation: &str) -> String {
    format!("{prefix}.gateway.{operation}")
}

/// Subject carrying interactions for one message.
pub fn interactions_subject(prefix: &str, message: MessageId) -> String {
    format!("{prefix}.interactions.{message}")
}

/// Subject carrying incoming chat commands.
pub fn commands_subject(prefix: &str) -> String {
    format!("{prefix}.commands")
}
