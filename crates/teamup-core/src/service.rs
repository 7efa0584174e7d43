//! Event creation and the handles returned to the command layer.
//!
//! [`EventService`] validates a [`CreationRequest`], resolves the voice
//! destination, posts the announcement, registers the event and spawns its
//! lifecycle task. Any failure before the spawn is reported as a
//! [`CreationError`] and no task is started.

use std::sync::Arc;

use chrono::Utc;
use teamup_types::{ChannelKind, CreationRequest, EventId, EventSummary, MessageHandle};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument as _, info, info_span, warn};

use crate::config::TimingConfig;
use crate::content;
use crate::event::{Deadline, EventState};
use crate::lifecycle::{EventLifecycle, EventOutcome};
use crate::messenger::{Messenger, MessagingError};
use crate::registry::{EventRegistry, Registration, RegistryEntry};
use crate::roster::Roster;

/// Why an event could not be created.
#[derive(Debug, thiserror::Error)]
pub enum CreationError {
    /// The request is missing a name, a positive headcount or a channel.
    #[error("insufficient parameters: {reason}")]
    InsufficientParameters {
        /// What is missing.
        reason: String,
    },

    /// No voice channel with the requested name exists in the guild.
    #[error("voice channel `{name}` not found")]
    ChannelNotFound {
        /// The requested channel name.
        name: String,
    },

    /// An event with the same identifier is already active.
    #[error("event {id} already exists")]
    DuplicateEvent {
        /// The conflicting identifier.
        id: EventId,
    },

    /// The voice channel lookup itself failed.
    #[error("channel lookup failed: {source}")]
    ChannelLookup {
        /// The underlying messaging error.
        source: MessagingError,
    },

    /// The announcement could not be posted.
    #[error("failed to post announcement: {source}")]
    Announcement {
        /// The underlying messaging error.
        source: MessagingError,
    },
}

/// Errors surfaced when waiting for a lifecycle task.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The task panicked or was aborted.
    #[error("lifecycle task failed: {source}")]
    Join {
        /// The underlying join error.
        #[from]
        source: tokio::task::JoinError,
    },
}

/// Handle to a running event.
#[derive(Debug)]
pub struct EventHandle {
    id: EventId,
    announcement: MessageHandle,
    cancel: CancellationToken,
    task: JoinHandle<EventOutcome>,
}

impl EventHandle {
    /// The event identifier.
    pub const fn id(&self) -> EventId {
        self.id
    }

    /// The announcement message.
    pub const fn announcement(&self) -> MessageHandle {
        self.announcement
    }

    /// Stop the event early. It ends in the `Cancelled` phase.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the lifecycle task has finished.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the lifecycle to reach a terminal phase.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Join`] if the task panicked.
    pub async fn wait(self) -> Result<EventOutcome, LifecycleError> {
        Ok(self.task.await?)
    }
}

/// Creates events and owns the shared pieces every lifecycle needs.
#[derive(Clone)]
pub struct EventService {
    registry: Arc<EventRegistry>,
    messenger: Arc<dyn Messenger>,
    timing: TimingConfig,
    shutdown: CancellationToken,
}

impl EventService {
    /// Create a service over an explicit registry and messenger.
    pub fn new(
        registry: Arc<EventRegistry>,
        messenger: Arc<dyn Messenger>,
        timing: TimingConfig,
    ) -> Self {
        Self {
            registry,
            messenger,
            timing,
            shutdown: CancellationToken::new(),
        }
    }

    /// The registry this service registers events in.
    pub const fn registry(&self) -> &Arc<EventRegistry> {
        &self.registry
    }

    /// Validate, announce, register and start an event.
    ///
    /// # Errors
    ///
    /// Returns a [`CreationError`] and starts nothing if the request is
    /// incomplete, the voice channel does not exist, the announcement cannot
    /// be posted, or the identifier is already registered.
    pub async fn create_event(
        &self,
        request: &CreationRequest,
    ) -> Result<EventHandle, CreationError> {
        validate(request)?;

        let voice_destination = self
            .messenger
            .resolve_channel_by_name(request.guild, &request.voice_channel_name, ChannelKind::Voice)
            .await
            .map_err(|source| CreationError::ChannelLookup { source })?
            .ok_or_else(|| CreationError::ChannelNotFound {
                name: request.voice_channel_name.clone(),
            })?;

        let announcement = self
            .messenger
            .render_message(
                request.channel,
                &content::announcement(&request.name, request.required_participants),
            )
            .await
            .map_err(|source| CreationError::Announcement { source })?;

        let id = EventId::from(announcement.message);
        let cancel = self.shutdown.child_token();
        let entry = RegistryEntry {
            summary: EventSummary {
                name: request.name.clone(),
                required_participants: request.required_participants,
                voice_destination: voice_destination.clone(),
                announcement,
                created_at: Utc::now(),
            },
            cancel: cancel.clone(),
        };

        if !self.registry.create(id, entry) {
            if let Err(e) = self.messenger.delete_message(&announcement).await {
                warn!(event_id = %id, error = %e, "failed to delete orphaned announcement");
            }
            return Err(CreationError::DuplicateEvent { id });
        }

        let state = EventState {
            id,
            name: request.name.clone(),
            required_participants: request.required_participants,
            deadline: Deadline::after(Instant::now(), request.duration_seconds),
            roster: Roster::new(),
            announcement,
            voice_destination,
            guild: request.guild,
        };
        let lifecycle = EventLifecycle::new(
            state,
            Arc::clone(&self.messenger),
            &self.timing,
            cancel.clone(),
        );
        let registration = Registration::new(Arc::clone(&self.registry), id);
        let span = info_span!("event", event_id = %id, name = %request.name);
        let task = tokio::spawn(lifecycle.run(registration).instrument(span));

        info!(
            event_id = %id,
            name = request.name,
            required = request.required_participants,
            duration_seconds = request.duration_seconds,
            requested_by = %request.requested_by,
            "event created"
        );

        Ok(EventHandle {
            id,
            announcement,
            cancel,
            task,
        })
    }

    /// Cancel an active event by identifier.
    ///
    /// Returns `false` if no such event is active.
    pub fn cancel_event(&self, id: EventId) -> bool {
        let cancelled = self.registry.cancel(id);
        if cancelled {
            info!(event_id = %id, "event cancellation requested");
        }
        cancelled
    }

    /// Cancel every active event.
    pub fn shutdown(&self) {
        info!(active_events = self.registry.len(), "cancelling all events");
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for EventService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventService")
            .field("registry", &self.registry)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

/// Reject requests that cannot describe an event.
fn validate(request: &CreationRequest) -> Result<(), CreationError> {
    if request.name.trim().is_empty() {
        return Err(CreationError::InsufficientParameters {
            reason: "event name is empty".to_owned(),
        });
    }
    if request.required_participants == 0 {
        return Err(CreationError::InsufficientParameters {
            reason: "required participants must be at least 1".to_owned(),
        });
    }
    if request.voice_channel_name.trim().is_empty() {
        return Err(CreationError::InsufficientParameters {
            reason: "voice channel name is empty".to_owned(),
        });
    }
    Ok(())
}
