//! Per-event lifecycle state machine.
//!
//! Each active event is driven by one [`EventLifecycle`] running in its own
//! task. The lifecycle moves through [`EventPhase`]s:
//!
//! ```text
//! Collecting --headcount--> ConfirmingReadiness --confirmed--> Started
//!     ^                            |
//!     +-------- not confirmed -----+
//! Collecting --deadline--> Expired
//! any active phase --cancel--> Cancelled
//! ```
//!
//! Collecting checks cancellation, then the headcount, then the deadline
//! before waiting. A failed round leaves the roster short, so an event whose
//! end time passed during that round expires instead of collecting again. Whatever the exit, the registry entry is removed
//! exactly once through the event's [`Registration`].

use std::sync::Arc;
use std::time::Duration;

use teamup_types::{Acknowledgement, EventId, EventPhase, Interaction, Member};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::TimingConfig;
use crate::content::{self, RosterAction};
use crate::event::EventState;
use crate::messenger::Messenger;
use crate::notify::NotificationDispatcher;
use crate::readiness::ReadinessCoordinator;
use crate::registry::Registration;

/// How an event's lifecycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOutcome {
    /// The event.
    pub id: EventId,
    /// Terminal phase reached.
    pub phase: EventPhase,
    /// Roster at the end, in join order.
    pub participants: Vec<Member>,
    /// Number of readiness rounds that ran.
    pub readiness_rounds: u32,
}

/// Driver for one event, from creation to a terminal phase.
pub struct EventLifecycle {
    state: EventState,
    messenger: Arc<dyn Messenger>,
    readiness: ReadinessCoordinator,
    notifier: NotificationDispatcher,
    poll_interval: Duration,
    cancel: CancellationToken,
    readiness_rounds: u32,
}

impl EventLifecycle {
    /// Build a lifecycle for a freshly registered event.
    pub fn new(
        state: EventState,
        messenger: Arc<dyn Messenger>,
        timing: &TimingConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            state,
            readiness: ReadinessCoordinator::new(Arc::clone(&messenger), timing.readiness_window()),
            notifier: NotificationDispatcher::new(Arc::clone(&messenger)),
            messenger,
            poll_interval: timing.poll_interval(),
            cancel,
            readiness_rounds: 0,
        }
    }

    /// Drive the event to a terminal phase.
    ///
    /// Consumes the registration; the registry entry is gone once this
    /// returns, and also if this future is dropped or unwinds early.
    pub async fn run(mut self, registration: Registration) -> EventOutcome {
        info!(
            event_id = %self.state.id,
            name = self.state.name,
            required = self.state.required_participants,
            "event lifecycle started"
        );

        let mut phase = EventPhase::Collecting;
        while !phase.is_terminal() {
            let next = self.step(phase).await;
            if next != phase {
                info!(event_id = %self.state.id, from = %phase, to = %next, "phase transition");
            }
            phase = next;
        }

        self.render_final(phase).await;
        self.messenger
            .close_interactions(&self.state.announcement)
            .await;
        registration.release();

        info!(
            event_id = %self.state.id,
            phase = %phase,
            participants = self.state.roster.len(),
            readiness_rounds = self.readiness_rounds,
            "event lifecycle finished"
        );

        EventOutcome {
            id: self.state.id,
            phase,
            participants: self.state.roster.snapshot(),
            readiness_rounds: self.readiness_rounds,
        }
    }

    /// Transition function: run one active phase and return the next one.
    async fn step(&mut self, phase: EventPhase) -> EventPhase {
        match phase {
            EventPhase::Collecting => self.collect().await,
            EventPhase::ConfirmingReadiness => self.confirm_readiness().await,
            EventPhase::Started | EventPhase::Expired | EventPhase::Cancelled => phase,
        }
    }

    /// Process interactions until the headcount is reached, the deadline
    /// passes, or the event is cancelled.
    async fn collect(&mut self) -> EventPhase {
        loop {
            if self.cancel.is_cancelled() {
                return EventPhase::Cancelled;
            }
            // A join that completed the roster before the deadline wins,
            // even if handling it ran past the deadline.
            if self.state.headcount_reached() {
                return EventPhase::ConfirmingReadiness;
            }
            let now = Instant::now();
            if self.state.deadline.has_passed(now) {
                return EventPhase::Expired;
            }

            let wait = self
                .state
                .deadline
                .remaining(now)
                .map_or(self.poll_interval, |left| left.min(self.poll_interval));

            let polled = tokio::select! {
                () = self.cancel.cancelled() => return EventPhase::Cancelled,
                polled = self.messenger.await_next_interaction(&self.state.announcement, wait) => polled,
            };

            match polled {
                Ok(Some(interaction)) => self.handle_interaction(&interaction).await,
                Ok(None) => {}
                Err(e) => {
                    warn!(event_id = %self.state.id, error = %e, "waiting for interactions failed");
                    // Back off for one poll so a failing transport is not hammered.
                    tokio::select! {
                        () = self.cancel.cancelled() => {}
                        () = tokio::time::sleep(wait) => {}
                    }
                }
            }
        }
    }

    /// Apply one announcement interaction. Errors are logged and swallowed.
    async fn handle_interaction(&mut self, interaction: &Interaction) {
        if let Err(e) = self
            .messenger
            .acknowledge_interaction(interaction, Acknowledgement::DeferredUpdate)
            .await
        {
            warn!(user = %interaction.user, error = %e, "failed to acknowledge interaction");
        }

        let Some(action) = RosterAction::from_control_id(&interaction.control_id) else {
            debug!(control_id = interaction.control_id, "ignoring unknown control");
            return;
        };

        let change = match action {
            RosterAction::Join => {
                match self
                    .messenger
                    .resolve_member(self.state.guild, interaction.user)
                    .await
                {
                    Ok(member) => self.state.roster.join(member),
                    Err(e) => {
                        warn!(user = %interaction.user, error = %e, "failed to resolve joining user");
                        return;
                    }
                }
            }
            RosterAction::Leave => self.state.roster.leave(interaction.user),
        };

        debug!(
            user = %interaction.user,
            ?action,
            ?change,
            participants = self.state.roster.len(),
            "roster interaction"
        );
        if change.is_changed() {
            self.render_roster().await;
        }
    }

    /// Run a readiness round and decide where to go next.
    ///
    /// The announcement is not polled during the round, so join and leave
    /// presses made meanwhile are applied and acknowledged only once the
    /// round ends, up to one readiness window later.
    async fn confirm_readiness(&mut self) -> EventPhase {
        self.readiness_rounds = self.readiness_rounds.saturating_add(1);
        let outcome = self.readiness.run_round(&mut self.state, &self.cancel).await;
        if outcome.cancelled {
            return EventPhase::Cancelled;
        }

        if outcome.confirmed {
            let report = self
                .notifier
                .notify_all(self.state.roster.members(), &self.state.voice_destination)
                .await;
            info!(
                event_id = %self.state.id,
                delivered = report.delivered.len(),
                failed = report.failed.len(),
                "start notices sent"
            );
            EventPhase::Started
        } else {
            self.render_roster().await;
            EventPhase::Collecting
        }
    }

    /// Show the current roster on the announcement.
    async fn render_roster(&self) {
        let content = content::roster(
            &self.state.name,
            self.state.required_participants,
            self.state.roster.members(),
        );
        if let Err(e) = self
            .messenger
            .edit_message(&self.state.announcement, &content)
            .await
        {
            warn!(event_id = %self.state.id, error = %e, "failed to update announcement");
        }
    }

    /// Replace the announcement with the terminal rendering.
    async fn render_final(&self, phase: EventPhase) {
        let content = match phase {
            EventPhase::Started => content::started(
                &self.state.name,
                self.state.required_participants,
                self.state.roster.members(),
            ),
            EventPhase::Expired => content::expired(&self.state.name),
            EventPhase::Cancelled => content::cancelled(&self.state.name),
            EventPhase::Collecting | EventPhase::ConfirmingReadiness => return,
        };
        if let Err(e) = self
            .messenger
            .edit_message(&self.state.announcement, &content)
            .await
        {
            warn!(event_id = %self.state.id, phase = %phase, error = %e, "failed to render final announcement");
        }
    }
}

impl std::fmt::Debug for EventLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLifecycle")
            .field("state", &self.state)
            .field("poll_interval", &self.poll_interval)
            .field("readiness_rounds", &self.readiness_rounds)
            .finish_non_exhaustive()
    }
}
