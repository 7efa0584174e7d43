//! Text and controls shown on announcements, prompts and notices.

use std::fmt::Write as _;

use teamup_types::{Control, ControlStyle, Member, MessageContent, UserId};

/// Control id of the announcement's join button.
pub const JOIN_CONTROL_ID: &str = "join_event";

/// Control id of the announcement's leave button.
pub const LEAVE_CONTROL_ID: &str = "leave_event";

/// Prefix of the per-participant readiness control id.
const READY_CONTROL_PREFIX: &str = "ready_";

/// What an announcement control press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterAction {
    /// Add the presser to the roster.
    Join,
    /// Remove the presser from the roster.
    Leave,
}

impl RosterAction {
    /// Map an announcement control id to its action.
    pub fn from_control_id(control_id: &str) -> Option<Self> {
        match control_id {
            JOIN_CONTROL_ID => Some(Self::Join),
            LEAVE_CONTROL_ID => Some(Self::Leave),
            _ => None,
        }
    }
}

/// Readiness control id for a participant (`ready_<user id>`).
pub fn ready_control_id(user: UserId) -> String {
    format!("{READY_CONTROL_PREFIX}{user}")
}

/// The join and leave buttons shown while an event is collecting.
fn roster_controls() -> Vec<Control> {
    vec![
        Control::new(JOIN_CONTROL_ID, "Join", ControlStyle::Primary),
        Control::new(LEAVE_CONTROL_ID, "Leave", ControlStyle::Danger),
    ]
}

/// First rendering of an event announcement.
pub fn announcement(name: &str, required: u32) -> MessageContent {
    MessageContent::with_controls(
        format!("🎮 **{name}**\nRequired participants: {required}.\nClick the button to join!"),
        roster_controls(),
    )
}

/// Roster listing body shared by the collecting and started renderings.
fn roster_text(name: &str, required: u32, participants: &[Member]) -> String {
    let mut text = format!(
        "🎮 **{name}**\nParticipants ({}/{required}):\n",
        participants.len()
    );
    if participants.is_empty() {
        text.push_str("No participants yet.");
    } else {
        let mut lines = participants.iter().peekable();
        while let Some(member) = lines.next() {
            let _ = write!(text, "- {}", member.display_name);
            if lines.peek().is_some() {
                text.push('\n');
            }
        }
    }
    text
}

/// Announcement while participants are being collected.
pub fn roster(name: &str, required: u32, participants: &[Member]) -> MessageContent {
    MessageContent::with_controls(roster_text(name, required, participants), roster_controls())
}

/// Final announcement once the event has started; controls are removed.
pub fn started(name: &str, required: u32, participants: &[Member]) -> MessageContent {
    let mut text = roster_text(name, required, participants);
    text.push_str("\nThe event has started!");
    MessageContent::text(text)
}

/// Final announcement when the end time passes.
pub fn expired(name: &str) -> MessageContent {
    MessageContent::text(format!(
        "{name} event time has ended. The event is now closed."
    ))
}

/// Final announcement when the event is stopped early.
pub fn cancelled(name: &str) -> MessageContent {
    MessageContent::text(format!("{name} event has been cancelled."))
}

/// Private prompt asking one participant to confirm readiness.
pub fn readiness_prompt(user: UserId) -> MessageContent {
    MessageContent::with_controls(
        "Please confirm your readiness for the event!",
        vec![Control::new(
            ready_control_id(user),
            "Ready",
            ControlStyle::Success,
        )],
    )
}

/// Reply shown to a participant who confirmed readiness.
pub const READY_REPLY: &str = "You are ready!";

/// Public notice naming a participant dropped for not confirming.
pub fn removal_notice(event_name: &str, member: &Member) -> MessageContent {
    MessageContent::text(format!(
        "{} was removed from **{event_name}**: readiness was not confirmed in time.",
        member.display_name
    ))
}

/// Private notice sent to every participant once the event starts.
pub fn start_notice(voice_channel_name: &str) -> MessageContent {
    MessageContent::text(format!(
        "The event has started! Please join the voice channel \"{voice_channel_name}\"."
    ))
}
