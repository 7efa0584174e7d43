//! Participant roster and its mutation entry points.
//!
//! The roster is an ordered, duplicate-free list of members. Order is join
//! order and is what the announcement displays. Every mutation, including
//! removals decided by a readiness round, goes through [`Roster::join`] or
//! [`Roster::leave`], and both report whether anything changed so callers
//! only re-render when needed.

use teamup_types::{Member, UserId};

/// Result of a roster mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterChange {
    /// The roster was modified.
    Changed,
    /// The roster already had the requested shape.
    NoOp,
}

impl RosterChange {
    /// Whether the roster was modified.
    pub const fn is_changed(self) -> bool {
        matches!(self, Self::Changed)
    }
}

/// Ordered set of event participants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    members: Vec<Member>,
}

impl Roster {
    /// Create an empty roster.
    pub const fn new() -> Self {
        Self {
            members: Vec::new(),
        }
    }

    /// Add a member if not already present.
    pub fn join(&mut self, member: Member) -> RosterChange {
        if self.contains(member.id) {
            RosterChange::NoOp
        } else {
            self.members.push(member);
            RosterChange::Changed
        }
    }

    /// Remove a member if present.
    pub fn leave(&mut self, user: UserId) -> RosterChange {
        let before = self.members.len();
        self.members.retain(|member| member.id != user);
        if self.members.len() == before {
            RosterChange::NoOp
        } else {
            RosterChange::Changed
        }
    }

    /// Whether `user` is on the roster.
    pub fn contains(&self, user: UserId) -> bool {
        self.members.iter().any(|member| member.id == user)
    }

    /// Number of participants.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in join order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Owned copy of the current members, for a readiness round.
    pub fn snapshot(&self) -> Vec<Member> {
        self.members.clone()
    }
}
