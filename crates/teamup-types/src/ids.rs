//! Type-safe identifier wrappers around platform snowflakes.
//!
//! Chat platforms hand out 64-bit snowflake identifiers for users, channels,
//! guilds and messages. Wrapping each one in its own newtype prevents a user
//! id from being passed where a channel id is expected.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around a `u64` snowflake with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Wrap a raw snowflake value.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Return the inner snowflake value.
            pub const fn into_inner(self) -> u64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl core::str::FromStr for $name {
            type Err = core::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<u64>().map(Self)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Identifier of a platform user.
    UserId
}

define_id! {
    /// Identifier of a text, voice or private channel.
    ChannelId
}

define_id! {
    /// Identifier of a guild (server) that owns channels and members.
    GuildId
}

define_id! {
    /// Identifier of a posted message.
    MessageId
}

define_id! {
    /// Identifier of an active event.
    ///
    /// Derived from the announcement message id, so it is unique for as
    /// long as the announcement exists.
    EventId
}

impl From<MessageId> for EventId {
    fn from(message: MessageId) -> Self {
        Self(message.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_id_derives_from_message_id() {
        let message = MessageId::new(1_234_567_890);
        let event = EventId::from(message);
        assert_eq!(event.into_inner(), message.into_inner());
    }

    #[test]
    fn ids_serialize_as_bare_numbers() {
        let json = serde_json::to_string(&UserId::new(42)).ok();
        assert_eq!(json.as_deref(), Some("42"));
        let restored: Result<UserId, _> = serde_json::from_str("42");
        assert_eq!(restored.ok(), Some(UserId::new(42)));
    }

    #[test]
    fn ids_parse_from_command_text() {
        let parsed: Result<EventId, _> = "987654321".parse();
        assert_eq!(parsed.ok(), Some(EventId::new(987_654_321)));
        assert!("not-a-number".parse::<EventId>().is_err());
    }

    #[test]
    fn id_display_matches_raw_value() {
        let id = ChannelId::new(77);
        assert_eq!(id.to_string(), "77");
    }
}
