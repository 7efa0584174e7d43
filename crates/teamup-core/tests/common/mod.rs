//! Shared fixture for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use teamup_core::config::TimingConfig;
use teamup_core::memory::InMemoryMessenger;
use teamup_core::registry::EventRegistry;
use teamup_core::service::EventService;
use teamup_types::{ChannelId, ChannelKind, CreationRequest, GuildId, UserId};

/// First guild member.
pub const ANN: UserId = UserId::new(1);
/// Second guild member.
pub const BOB: UserId = UserId::new(2);
/// Third guild member.
pub const CID: UserId = UserId::new(3);
/// Guild every fixture channel belongs to.
pub const GUILD: GuildId = GuildId::new(500);

/// Messenger, registry and service wired together.
pub struct Fixture {
    /// The in-memory platform.
    pub messenger: Arc<InMemoryMessenger>,
    /// The shared registry.
    pub registry: Arc<EventRegistry>,
    /// Service creating events.
    pub service: EventService,
    /// Text channel announcements go to.
    pub channel: ChannelId,
    /// The `Voice1` voice channel.
    pub voice: ChannelId,
}

/// Build a fixture with default timing.
pub fn fixture() -> Fixture {
    let messenger = Arc::new(InMemoryMessenger::new());
    let channel = messenger.add_channel(GUILD, "general", ChannelKind::Text);
    let voice = messenger.add_channel(GUILD, "Voice1", ChannelKind::Voice);
    messenger.add_member(ANN, "Ann");
    messenger.add_member(BOB, "Bob");
    messenger.add_member(CID, "Cid");

    let registry = Arc::new(EventRegistry::new());
    let service = EventService::new(
        Arc::clone(&registry),
        messenger.clone(),
        TimingConfig::default(),
    );
    Fixture {
        messenger,
        registry,
        service,
        channel,
        voice,
    }
}

impl Fixture {
    /// A creation request targeting `Voice1`.
    pub fn request(&self, name: &str, required: u32, duration_seconds: u64) -> CreationRequest {
        CreationRequest {
            name: name.to_owned(),
            required_participants: required,
            duration_seconds,
            voice_channel_name: "Voice1".to_owned(),
            guild: GUILD,
            channel: self.channel,
            requested_by: ANN,
        }
    }
}
