//! [`Messenger`] implementation that talks to the platform gateway over NATS.
//!
//! Every messenger operation is a request/reply round trip on
//! `{prefix}.gateway.{operation}`. Control presses are delivered on a
//! per-message subject; [`GatewayMessenger`] subscribes when a message with
//! controls is posted and keeps the subscription until
//! [`Messenger::close_interactions`] is called.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::StreamExt as _;
use serde::Serialize;
use serde::de::DeserializeOwned;
use teamup_core::messenger::{Messenger, MessagingError};
use teamup_types::{
    Acknowledgement, Channel, ChannelId, ChannelKind, GuildId, Interaction, Member, MessageContent,
    MessageHandle, MessageId, UserId,
};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::wire::{
    AcknowledgeRequest, ChannelLookupRequest, DeleteRequest, EditRequest, GatewayReply,
    MemberLookupRequest, PostRequest, PrivateChannelRequest, gateway_subject,
    interactions_subject,
};

/// Why a gateway call failed, before it is mapped to a [`MessagingError`].
#[derive(Debug, thiserror::Error)]
enum CallError {
    /// The gateway answered with an error.
    #[error("{0}")]
    Rejected(String),
    /// The request never got a usable answer.
    #[error("{0}")]
    Transport(String),
}

impl From<CallError> for MessagingError {
    fn from(e: CallError) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Messenger backed by a NATS connection to the platform gateway.
pub struct GatewayMessenger {
    client: async_nats::Client,
    prefix: String,
    timeout: Duration,
    subscriptions: DashMap<MessageId, Arc<Mutex<async_nats::Subscriber>>>,
}

impl GatewayMessenger {
    /// Create a messenger over an existing connection.
    ///
    /// `prefix` roots every subject; `timeout` bounds each gateway call.
    pub fn new(client: async_nats::Client, prefix: &str, timeout: Duration) -> Self {
        Self {
            client,
            prefix: prefix.to_owned(),
            timeout,
            subscriptions: DashMap::new(),
        }
    }

    /// Send one request and decode the gateway's reply.
    async fn call<Req, Resp>(&self, operation: &str, body: &Req) -> Result<Resp, CallError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned + Send,
    {
        let subject = gateway_subject(&self.prefix, operation);
        let payload = serde_json::to_vec(body)
            .map_err(|e| CallError::Transport(format!("failed to serialize {operation}: {e}")))?;
        debug!(subject = subject, "gateway request");

        let response = tokio::time::timeout(
            self.timeout,
            self.client.request(subject.clone(), payload.into()),
        )
        .await
        .map_err(|_elapsed| {
            CallError::Transport(format!("{subject} timed out after {:?}", self.timeout))
        })?
        .map_err(|e| CallError::Transport(format!("request to {subject} failed: {e}")))?;

        let reply: GatewayReply<Resp> = serde_json::from_slice(&response.payload)
            .map_err(|e| CallError::Transport(format!("malformed reply on {subject}: {e}")))?;
        match reply {
            GatewayReply::Ok(value) => Ok(value),
            GatewayReply::Err(message) => Err(CallError::Rejected(message)),
        }
    }

    /// Subscription for a message's interactions, created on first use.
    async fn subscription(
        &self,
        message: MessageId,
    ) -> Result<Arc<Mutex<async_nats::Subscriber>>, MessagingError> {
        if let Some(existing) = self.subscriptions.get(&message) {
            return Ok(Arc::clone(existing.value()));
        }
        let subject = interactions_subject(&self.prefix, message);
        let subscriber = self.client.subscribe(subject.clone()).await.map_err(|e| {
            MessagingError::Transport(format!("failed to subscribe to {subject}: {e}"))
        })?;
        debug!(subject = subject, "subscribed to interactions");
        let entry = self
            .subscriptions
            .entry(message)
            .or_insert_with(|| Arc::new(Mutex::new(subscriber)));
        Ok(Arc::clone(entry.value()))
    }

    /// Post a message and start listening for its controls if it has any.
    async fn post(
        &self,
        operation: &str,
        channel: ChannelId,
        content: &MessageContent,
    ) -> Result<MessageHandle, CallError> {
        let handle: MessageHandle = self
            .call(operation, &PostRequest { channel, content })
            .await?;
        if !content.controls.is_empty() {
            if let Err(e) = self.subscription(handle.message).await {
                warn!(message = %handle.message, error = %e, "failed to pre-subscribe to interactions");
            }
        }
        Ok(handle)
    }
}

#[async_trait]
impl Messenger for GatewayMessenger {
    async fn render_message(
        &self,
        channel: ChannelId,
        content: &MessageContent,
    ) -> Result<MessageHandle, MessagingError> {
        Ok(self.post("render_message", channel, content).await?)
    }

    async fn edit_message(
        &self,
        handle: &MessageHandle,
        content: &MessageContent,
    ) -> Result<(), MessagingError> {
        Ok(self
            .call("edit_message", &EditRequest { handle, content })
            .await?)
    }

    async fn delete_message(&self, handle: &MessageHandle) -> Result<(), MessagingError> {
        self.close_interactions(handle).await;
        Ok(self
            .call("delete_message", &DeleteRequest { handle })
            .await?)
    }

    async fn await_next_interaction(
        &self,
        handle: &MessageHandle,
        timeout: Duration,
    ) -> Result<Option<Interaction>, MessagingError> {
        let subscription = self.subscription(handle.message).await?;
        let mut subscriber = subscription.lock().await;
        let deadline = Instant::now()
            .checked_add(timeout)
            .unwrap_or_else(Instant::now);

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let Ok(next) = tokio::time::timeout(remaining, subscriber.next()).await else {
                return Ok(None);
            };
            let Some(message) = next else {
                return Err(MessagingError::UnknownMessage { handle: *handle });
            };
            match serde_json::from_slice::<Interaction>(&message.payload) {
                Ok(interaction) => return Ok(Some(interaction)),
                Err(e) => {
                    warn!(subject = %message.subject, error = %e, "dropping malformed interaction");
                }
            }
        }
    }

    async fn acknowledge_interaction(
        &self,
        interaction: &Interaction,
        acknowledgement: Acknowledgement,
    ) -> Result<(), MessagingError> {
        Ok(self
            .call(
                "acknowledge_interaction",
                &AcknowledgeRequest {
                    interaction,
                    acknowledgement: &acknowledgement,
                },
            )
            .await?)
    }

    async fn open_private_channel(&self, user: UserId) -> Result<ChannelId, MessagingError> {
        self.call("open_private_channel", &PrivateChannelRequest { user })
            .await
            .map_err(|e| match e {
                CallError::Rejected(message) => MessagingError::Unreachable { user, message },
                CallError::Transport(message) => MessagingError::Transport(message),
            })
    }

    async fn send_message(
        &self,
        channel: ChannelId,
        content: &MessageContent,
    ) -> Result<MessageHandle, MessagingError> {
        Ok(self.post("send_message", channel, content).await?)
    }

    async fn resolve_channel_by_name(
        &self,
        guild: GuildId,
        name: &str,
        kind: ChannelKind,
    ) -> Result<Option<Channel>, MessagingError> {
        Ok(self
            .call(
                "resolve_channel_by_name",
                &ChannelLookupRequest { guild, name, kind },
            )
            .await?)
    }

    async fn resolve_member(&self, guild: GuildId, user: UserId) -> Result<Member, MessagingError> {
        self.call("resolve_member", &MemberLookupRequest { guild, user })
            .await
            .map_err(|e| match e {
                CallError::Rejected(_) => MessagingError::UnknownMember { guild, user },
                CallError::Transport(message) => MessagingError::Transport(message),
            })
    }

    async fn close_interactions(&self, handle: &MessageHandle) {
        let Some((_, subscription)) = self.subscriptions.remove(&handle.message) else {
            return;
        };
        if let Err(e) = subscription.lock().await.unsubscribe().await {
            warn!(message = %handle.message, error = %e, "failed to unsubscribe from interactions");
        }
    }
}

impl std::fmt::Debug for GatewayMessenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayMessenger")
            .field("prefix", &self.prefix)
            .field("timeout", &self.timeout)
            .field("subscriptions", &self.subscriptions.len())
            .finish_non_exhaustive()
    }
}
