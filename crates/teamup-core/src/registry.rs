//! Process-wide registry of active events.
//!
//! [`EventRegistry`] is the single source of truth for which events exist.
//! It is created once by the binary and passed explicitly (as an
//! `Arc<EventRegistry>`) to creation and to every lifecycle task. Insertion
//! is atomic insert-if-absent and removal is idempotent, so many lifecycle
//! tasks can create and remove entries concurrently without external locks.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use teamup_types::{EventId, EventSummary};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// What the registry keeps per active event.
///
/// The mutable event state is owned by the lifecycle task; the registry
/// only holds the immutable summary and the event's cancellation token.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    /// Read-only view of the event.
    pub summary: EventSummary,
    /// Token that stops the event's lifecycle task.
    pub cancel: CancellationToken,
}

/// Concurrent map from event identifier to [`RegistryEntry`].
#[derive(Debug, Default)]
pub struct EventRegistry {
    events: DashMap<EventId, RegistryEntry>,
}

impl EventRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically insert an entry.
    ///
    /// Returns `false` without overwriting when `id` is already present.
    pub fn create(&self, id: EventId, entry: RegistryEntry) -> bool {
        match self.events.entry(id) {
            Entry::Occupied(_) => {
                warn!(event_id = %id, "event already registered");
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(entry);
                debug!(event_id = %id, "event registered");
                true
            }
        }
    }

    /// Remove an entry. No-op when absent.
    pub fn remove(&self, id: EventId) {
        if self.events.remove(&id).is_some() {
            debug!(event_id = %id, "event removed from registry");
        }
    }

    /// Whether an event is registered.
    pub fn contains(&self, id: EventId) -> bool {
        self.events.contains_key(&id)
    }

    /// Summary of a registered event.
    pub fn summary(&self, id: EventId) -> Option<EventSummary> {
        self.events.get(&id).map(|entry| entry.summary.clone())
    }

    /// Summaries of every active event, oldest identifier first.
    pub fn summaries(&self) -> Vec<(EventId, EventSummary)> {
        let mut all: Vec<(EventId, EventSummary)> = self
            .events
            .iter()
            .map(|entry| (*entry.key(), entry.value().summary.clone()))
            .collect();
        all.sort_by_key(|(id, _)| *id);
        all
    }

    /// Trigger an event's cancellation token.
    ///
    /// Returns `false` if no such event is registered. The lifecycle task
    /// removes the entry itself once it has wound down.
    pub fn cancel(&self, id: EventId) -> bool {
        self.events.get(&id).is_some_and(|entry| {
            entry.cancel.cancel();
            true
        })
    }

    /// Number of active events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events are active.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Ownership of one registry entry, held by the event's lifecycle task.
///
/// The entry is removed exactly once: by [`Registration::release`] on an
/// orderly exit, or by `Drop` if the task unwinds.
#[derive(Debug)]
pub struct Registration {
    registry: Option<Arc<EventRegistry>>,
    id: EventId,
}

impl Registration {
    /// Take ownership of the entry for `id`, which must already be
    /// registered.
    pub const fn new(registry: Arc<EventRegistry>, id: EventId) -> Self {
        Self {
            registry: Some(registry),
            id,
        }
    }

    /// Remove the entry now.
    pub fn release(mut self) {
        self.remove_entry();
    }

    fn remove_entry(&mut self) {
        if let Some(registry) = self.registry.take() {
            registry.remove(self.id);
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if self.registry.is_some() {
            warn!(event_id = %self.id, "lifecycle ended abnormally, removing event");
            self.remove_entry();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use teamup_types::{Channel, ChannelId, ChannelKind, MessageHandle, MessageId};

    use super::*;

    fn entry(name: &str) -> RegistryEntry {
        RegistryEntry {
            summary: EventSummary {
                name: name.to_owned(),
                required_participants: 2,
                voice_destination: Channel {
                    id: ChannelId::new(5),
                    name: "Voice1".to_owned(),
                    kind: ChannelKind::Voice,
                },
                announcement: MessageHandle {
                    channel: ChannelId::new(1),
                    message: MessageId::new(10),
                },
                created_at: Utc::now(),
            },
            cancel: CancellationToken::new(),
        }
    }

    #[test]
    fn create_rejects_duplicates_without_overwriting() {
        let registry = EventRegistry::new();
        let id = EventId::new(10);
        assert!(registry.create(id, entry("Raid")));
        assert!(!registry.create(id, entry("Other")));
        assert_eq!(registry.summary(id).unwrap().name, "Raid");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn summaries_are_ordered_by_id() {
        let registry = EventRegistry::new();
        assert!(registry.create(EventId::new(9), entry("Late")));
        assert!(registry.create(EventId::new(3), entry("Early")));
        let names: Vec<String> = registry
            .summaries()
            .into_iter()
            .map(|(_, summary)| summary.name)
            .collect();
        assert_eq!(names, vec!["Early".to_owned(), "Late".to_owned()]);
    }

    #[test]
    fn remove_is_idempotent() {
        let registry = EventRegistry::new();
        let id = EventId::new(10);
        assert!(registry.create(id, entry("Raid")));
        registry.remove(id);
        registry.remove(id);
        assert!(!registry.contains(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn cancel_triggers_the_stored_token() {
        let registry = EventRegistry::new();
        let id = EventId::new(10);
        let created = entry("Raid");
        let token = created.cancel.clone();
        assert!(registry.create(id, created));
        assert!(registry.cancel(id));
        assert!(token.is_cancelled());
        assert!(!registry.cancel(EventId::new(11)));
    }

    #[test]
    fn registration_removes_on_release() {
        let registry = Arc::new(EventRegistry::new());
        let id = EventId::new(10);
        assert!(registry.create(id, entry("Raid")));
        let registration = Registration::new(Arc::clone(&registry), id);
        registration.release();
        assert!(!registry.contains(id));
    }

    #[test]
    fn registration_removes_on_drop() {
        let registry = Arc::new(EventRegistry::new());
        let id = EventId::new(10);
        assert!(registry.create(id, entry("Raid")));
        {
            let _registration = Registration::new(Arc::clone(&registry), id);
        }
        assert!(!registry.contains(id));
    }

    #[test]
    fn concurrent_creates_admit_exactly_one() {
        let registry = Arc::new(EventRegistry::new());
        let id = EventId::new(10);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.create(id, entry("Raid")))
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
    }
}
