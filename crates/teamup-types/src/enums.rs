//! Enumeration types shared between the core and the bot binary.

use serde::{Deserialize, Serialize};

/// Visual style of an interactive control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlStyle {
    /// Highlighted call-to-action button.
    Primary,
    /// Green confirmation button.
    Success,
    /// Red destructive button.
    Danger,
}

/// Kind of a platform channel, used to filter channel lookups by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Guild text channel.
    Text,
    /// Guild voice channel.
    Voice,
}

/// Phase of an event's lifecycle.
///
/// `Collecting` and `ConfirmingReadiness` are active phases; the remaining
/// three are terminal and end the lifecycle loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPhase {
    /// Waiting for join/leave interactions until the headcount is reached.
    Collecting,
    /// Running a readiness round against a snapshot of the roster.
    ConfirmingReadiness,
    /// Enough participants confirmed; the event has started.
    Started,
    /// The end time passed before the event started.
    Expired,
    /// The event was stopped through its cancellation token.
    Cancelled,
}

impl EventPhase {
    /// Whether the phase ends the lifecycle loop.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Started | Self::Expired | Self::Cancelled)
    }
}

impl core::fmt::Display for EventPhase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let label = match self {
            Self::Collecting => "collecting",
            Self::ConfirmingReadiness => "confirming_readiness",
            Self::Started => "started",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_final_phases_are_terminal() {
        assert!(!EventPhase::Collecting.is_terminal());
        assert!(!EventPhase::ConfirmingReadiness.is_terminal());
        assert!(EventPhase::Started.is_terminal());
        assert!(EventPhase::Expired.is_terminal());
        assert!(EventPhase::Cancelled.is_terminal());
    }

    #[test]
    fn channel_kind_uses_snake_case() {
        let json = serde_json::to_string(&ChannelKind::Voice).ok();
        assert_eq!(json.as_deref(), Some("\"voice\""));
    }
}
