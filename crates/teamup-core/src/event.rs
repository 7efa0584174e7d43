//! Per-event state owned by a lifecycle task.

use std::time::Duration;

use teamup_types::{Channel, EventId, GuildId, MessageHandle};
use tokio::time::Instant;

use crate::roster::Roster;

/// When an event stops collecting participants on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// Expires at this instant.
    At(Instant),
    /// Never expires; only starting or cancellation end the event.
    Never,
}

impl Deadline {
    /// Deadline `duration_seconds` after `now`; zero means [`Deadline::Never`].
    ///
    /// A duration too large to represent is also treated as never.
    pub fn after(now: Instant, duration_seconds: u64) -> Self {
        if duration_seconds == 0 {
            return Self::Never;
        }
        now.checked_add(Duration::from_secs(duration_seconds))
            .map_or(Self::Never, Self::At)
    }

    /// Whether the deadline has passed at `now`.
    pub fn has_passed(self, now: Instant) -> bool {
        match self {
            Self::At(end) => now >= end,
            Self::Never => false,
        }
    }

    /// Time left before the deadline, or `None` when it never expires.
    pub fn remaining(self, now: Instant) -> Option<Duration> {
        match self {
            Self::At(end) => Some(end.saturating_duration_since(now)),
            Self::Never => None,
        }
    }
}

/// Mutable state of one active event.
///
/// Owned exclusively by the event's lifecycle task; nothing else holds a
/// reference to it, so the roster needs no lock.
#[derive(Debug)]
pub struct EventState {
    /// Registry key, derived from the announcement message.
    pub id: EventId,
    /// Display name.
    pub name: String,
    /// Headcount that triggers a readiness round.
    pub required_participants: u32,
    /// When collection stops.
    pub deadline: Deadline,
    /// Current participants.
    pub roster: Roster,
    /// The announcement message the roster is rendered into.
    pub announcement: MessageHandle,
    /// Voice channel participants are sent to.
    pub voice_destination: Channel,
    /// Guild the event belongs to, for member lookups.
    pub guild: GuildId,
}

impl EventState {
    /// Whether the roster has reached the required headcount.
    pub fn headcount_reached(&self) -> bool {
        usize::try_from(self.required_participants)
            .is_ok_and(|required| self.roster.len() >= required)
    }
}
