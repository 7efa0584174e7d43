//! Shared type definitions for the `TeamUp` event-coordination bot.
//!
//! # Modules
//!
//! - [`ids`] -- Snowflake newtypes for users, channels, guilds, messages and events
//! - [`enums`] -- Control styles, channel kinds and lifecycle phases
//! - [`structs`] -- Message content, interactions, members and creation requests

pub mod enums;
pub mod ids;
pub mod structs;

pub use enums::{ChannelKind, ControlStyle, EventPhase};
pub use ids::{ChannelId, EventId, GuildId, MessageId, UserId};
pub use structs::{
    Acknowledgement, Channel, Control, CreationRequest, EventSummary, Interaction, Member,
    MessageContent, MessageHandle,
};
