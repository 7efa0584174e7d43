//! Readiness confirmation round.
//!
//! Once an event reaches its headcount, every participant in a snapshot of
//! the roster is asked privately to confirm. Prompts run concurrently and
//! each one waits at most the readiness window. Participants who confirm are
//! ready; timeouts and delivery failures make a participant unready. After
//! the round, unready participants are removed from the roster and a public
//! notice names each of them.
//!
//! Nothing is cached between rounds: reaching the headcount again always
//! runs a fresh round.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use teamup_types::{Acknowledgement, Member, UserId};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::content;
use crate::event::EventState;
use crate::messenger::{Messenger, MessagingError};

/// How a single participant's prompt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Confirmed within the window.
    Ready,
    /// The window elapsed without a confirmation.
    TimedOut,
    /// The prompt could not be delivered or the wait failed.
    Undeliverable,
    /// The event was cancelled while waiting.
    Cancelled,
}

/// Result of a readiness round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    /// Participants who confirmed, in roster order.
    pub ready: Vec<UserId>,
    /// Participants removed from the roster for not confirming.
    pub removed: Vec<Member>,
    /// Whether enough participants confirmed to start the event.
    pub confirmed: bool,
    /// Whether the round was cut short by cancellation. Nobody is removed
    /// and nothing is confirmed in that case.
    pub cancelled: bool,
}

/// Runs readiness rounds through a [`Messenger`].
#[derive(Clone)]
pub struct ReadinessCoordinator {
    messenger: Arc<dyn Messenger>,
    window: Duration,
}

impl ReadinessCoordinator {
    /// Create a coordinator with the given per-participant window.
    pub fn new(messenger: Arc<dyn Messenger>, window: Duration) -> Self {
        Self { messenger, window }
    }

    /// Run one round against a snapshot of `state.roster`.
    ///
    /// Unready participants are removed through the roster entry point and
    /// announced in the announcement's channel. When `cancel` fires, every
    /// prompt stops waiting and is closed, and the roster is left as is.
    pub async fn run_round(
        &self,
        state: &mut EventState,
        cancel: &CancellationToken,
    ) -> RoundOutcome {
        let snapshot = state.roster.snapshot();
        info!(
            event_id = %state.id,
            participants = snapshot.len(),
            window_ms = self.window.as_millis(),
            "readiness round started"
        );

        let verdicts = join_all(snapshot.iter().map(|member| self.confirm(member, cancel))).await;

        if cancel.is_cancelled() {
            info!(event_id = %state.id, "readiness round cancelled");
            let ready = snapshot
                .iter()
                .zip(&verdicts)
                .filter(|(_, verdict)| **verdict == Verdict::Ready)
                .map(|(member, _)| member.id)
                .collect();
            return RoundOutcome {
                ready,
                removed: Vec::new(),
                confirmed: false,
                cancelled: true,
            };
        }

        let mut ready = Vec::new();
        let mut unready = Vec::new();
        for (member, verdict) in snapshot.into_iter().zip(verdicts) {
            if verdict == Verdict::Ready {
                ready.push(member.id);
            } else {
                debug!(user = %member.id, ?verdict, "participant not ready");
                unready.push(member);
            }
        }

        let mut removed = Vec::new();
        for member in unready {
            if state.roster.leave(member.id).is_changed() {
                let notice = content::removal_notice(&state.name, &member);
                if let Err(e) = self
                    .messenger
                    .render_message(state.announcement.channel, &notice)
                    .await
                {
                    warn!(user = %member.id, error = %e, "failed to post removal notice");
                }
                removed.push(member);
            }
        }

        let confirmed = usize::try_from(state.required_participants)
            .is_ok_and(|required| ready.len() >= required);
        info!(
            event_id = %state.id,
            ready = ready.len(),
            removed = removed.len(),
            confirmed,
            "readiness round finished"
        );

        RoundOutcome {
            ready,
            removed,
            confirmed,
            cancelled: false,
        }
    }

    /// Prompt one participant and wait for their confirmation.
    async fn confirm(&self, member: &Member, cancel: &CancellationToken) -> Verdict {
        match self.prompt_and_wait(member, cancel).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(
                    user = %member.id,
                    name = member.display_name,
                    error = %e,
                    "readiness prompt failed"
                );
                Verdict::Undeliverable
            }
        }
    }

    async fn prompt_and_wait(
        &self,
        member: &Member,
        cancel: &CancellationToken,
    ) -> Result<Verdict, MessagingError> {
        if cancel.is_cancelled() {
            return Ok(Verdict::Cancelled);
        }
        let channel = self.messenger.open_private_channel(member.id).await?;
        let prompt = self
            .messenger
            .send_message(channel, &content::readiness_prompt(member.id))
            .await?;
        let expected = content::ready_control_id(member.id);
        let deadline = Instant::now()
            .checked_add(self.window)
            .unwrap_or_else(Instant::now);

        let verdict = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break Verdict::TimedOut;
            }
            let polled = tokio::select! {
                () = cancel.cancelled() => break Verdict::Cancelled,
                polled = self.messenger.await_next_interaction(&prompt, remaining) => polled,
            };
            match polled {
                Ok(Some(interaction))
                    if interaction.user == member.id && interaction.control_id == expected =>
                {
                    if let Err(e) = self
                        .messenger
                        .acknowledge_interaction(
                            &interaction,
                            Acknowledgement::Reply(content::READY_REPLY.to_owned()),
                        )
                        .await
                    {
                        warn!(user = %member.id, error = %e, "failed to acknowledge readiness");
                    }
                    break Verdict::Ready;
                }
                Ok(Some(interaction)) => {
                    debug!(
                        expected_user = %member.id,
                        user = %interaction.user,
                        control_id = interaction.control_id,
                        "ignoring unrelated interaction on readiness prompt"
                    );
                }
                Ok(None) => break Verdict::TimedOut,
                Err(e) => {
                    self.messenger.close_interactions(&prompt).await;
                    return Err(e);
                }
            }
        };

        self.messenger.close_interactions(&prompt).await;
        Ok(verdict)
    }
}

impl std::fmt::Debug for ReadinessCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessCoordinator")
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}
