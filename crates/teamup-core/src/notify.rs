//! Best-effort "event started" fan-out.

use std::sync::Arc;

use teamup_types::{Channel, Member, MessageContent, UserId};
use tracing::{debug, warn};

use crate::content;
use crate::messenger::{Messenger, MessagingError};

/// Which participants were reached by a fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Participants who received the notice.
    pub delivered: Vec<UserId>,
    /// Participants who could not be reached.
    pub failed: Vec<UserId>,
}

/// Sends the voice destination privately to every participant.
#[derive(Clone)]
pub struct NotificationDispatcher {
    messenger: Arc<dyn Messenger>,
}

impl NotificationDispatcher {
    /// Create a dispatcher.
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self { messenger }
    }

    /// Notify each participant of `destination`.
    ///
    /// A failure for one participant is logged and never stops the batch.
    pub async fn notify_all(&self, participants: &[Member], destination: &Channel) -> DeliveryReport {
        let notice = content::start_notice(&destination.name);
        let mut report = DeliveryReport::default();
        for member in participants {
            match self.deliver(member.id, &notice).await {
                Ok(()) => {
                    debug!(user = %member.id, "start notice delivered");
                    report.delivered.push(member.id);
                }
                Err(e) => {
                    warn!(
                        user = %member.id,
                        name = member.display_name,
                        error = %e,
                        "failed to deliver start notice"
                    );
                    report.failed.push(member.id);
                }
            }
        }
        report
    }

    async fn deliver(
        &self,
        user: UserId,
        notice: &MessageContent,
    ) -> Result<(), MessagingError> {
        let channel = self.messenger.open_private_channel(user).await?;
        self.messenger.send_message(channel, notice).await?;
        Ok(())
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher").finish_non_exhaustive()
    }
}
