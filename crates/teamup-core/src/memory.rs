//! In-process [`Messenger`] backed by plain data structures.
//!
//! [`InMemoryMessenger`] records every message, edit and acknowledgement so
//! tests can assert on what users would have seen, and lets tests press
//! controls on behalf of users. Users can be marked unreachable to simulate
//! private-message failures, or set to confirm readiness prompts on their
//! own. Snowflakes for channels, messages and interactions are handed out
//! sequentially from a single counter.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use teamup_types::{
    Acknowledgement, Channel, ChannelId, ChannelKind, GuildId, Interaction, Member, MessageContent,
    MessageHandle, MessageId, UserId,
};
use tokio::sync::mpsc;

use crate::messenger::{Messenger, MessagingError};

/// First snowflake handed out by the messenger.
const FIRST_ID: u64 = 1_000;

/// A message as currently shown, plus how often it was edited.
#[derive(Debug, Clone)]
struct StoredMessage {
    channel: ChannelId,
    content: MessageContent,
    edits: u32,
    deleted: bool,
}

/// Sender and shared receiver for one message's interactions.
#[derive(Debug, Clone)]
struct InteractionQueue {
    tx: mpsc::UnboundedSender<Interaction>,
    rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Interaction>>>,
}

impl InteractionQueue {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    channels: Vec<(GuildId, Channel)>,
    members: HashMap<UserId, String>,
    unreachable: HashSet<UserId>,
    auto_confirm: HashSet<UserId>,
    private_channels: HashMap<ChannelId, UserId>,
    messages: HashMap<MessageId, StoredMessage>,
    order: Vec<MessageId>,
    queues: HashMap<MessageId, InteractionQueue>,
    acknowledgements: Vec<(Interaction, Acknowledgement)>,
    fail_edits: bool,
    member_lookup_delay: Duration,
}

impl State {
    fn allocate_id(&mut self) -> u64 {
        if self.next_id < FIRST_ID {
            self.next_id = FIRST_ID;
        }
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    fn post(&mut self, channel: ChannelId, content: &MessageContent) -> MessageHandle {
        let message = MessageId::new(self.allocate_id());
        self.messages.insert(
            message,
            StoredMessage {
                channel,
                content: content.clone(),
                edits: 0,
                deleted: false,
            },
        );
        self.order.push(message);
        MessageHandle { channel, message }
    }

    fn queue(&mut self, message: MessageId) -> InteractionQueue {
        self.queues
            .entry(message)
            .or_insert_with(InteractionQueue::new)
            .clone()
    }

    fn enqueue(&mut self, message: MessageId, control_id: &str, user: UserId) {
        let token = format!("interaction-{}", self.allocate_id());
        let interaction = Interaction {
            token,
            message,
            control_id: control_id.to_owned(),
            user,
        };
        // The receiver lives as long as the queue entry, so a send only
        // fails after `close_interactions`, when nobody is listening.
        let _ = self.queue(message).tx.send(interaction);
    }
}

/// [`Messenger`] that keeps everything in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMessenger {
    state: Arc<Mutex<State>>,
}

impl InMemoryMessenger {
    /// Create an empty messenger.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // World setup
    // -----------------------------------------------------------------------

    /// Register a guild channel and return its id.
    pub fn add_channel(&self, guild: GuildId, name: &str, kind: ChannelKind) -> ChannelId {
        let mut state = self.lock();
        let id = ChannelId::new(state.allocate_id());
        state.channels.push((
            guild,
            Channel {
                id,
                name: name.to_owned(),
                kind,
            },
        ));
        id
    }

    /// Register a guild member with a display name.
    pub fn add_member(&self, user: UserId, display_name: &str) {
        self.lock().members.insert(user, display_name.to_owned());
    }

    /// Make private messages to `user` fail.
    pub fn set_unreachable(&self, user: UserId) {
        self.lock().unreachable.insert(user);
    }

    /// Have `user` confirm every readiness prompt sent to them.
    pub fn set_auto_confirm(&self, user: UserId, enabled: bool) {
        let mut state = self.lock();
        if enabled {
            state.auto_confirm.insert(user);
        } else {
            state.auto_confirm.remove(&user);
        }
    }

    /// Delay every member lookup, like a slow platform round trip.
    pub fn set_member_lookup_delay(&self, delay: Duration) {
        self.lock().member_lookup_delay = delay;
    }

    /// Make every message edit fail.
    pub fn set_fail_edits(&self, fail: bool) {
        self.lock().fail_edits = fail;
    }

    // -----------------------------------------------------------------------
    // User actions
    // -----------------------------------------------------------------------

    /// Press a control on a message as `user`.
    pub fn press(&self, message: MessageId, control_id: &str, user: UserId) {
        self.lock().enqueue(message, control_id, user);
    }

    // -----------------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------------

    /// Current content of a message.
    pub fn content(&self, message: MessageId) -> Option<MessageContent> {
        self.lock()
            .messages
            .get(&message)
            .map(|stored| stored.content.clone())
    }

    /// How many times a message was edited.
    pub fn edit_count(&self, message: MessageId) -> u32 {
        self.lock()
            .messages
            .get(&message)
            .map_or(0, |stored| stored.edits)
    }

    /// Whether a message was deleted.
    pub fn is_deleted(&self, message: MessageId) -> bool {
        self.lock()
            .messages
            .get(&message)
            .is_some_and(|stored| stored.deleted)
    }

    /// Texts of all messages posted to a channel, oldest first.
    pub fn texts_in(&self, channel: ChannelId) -> Vec<String> {
        let state = self.lock();
        state
            .order
            .iter()
            .filter_map(|id| state.messages.get(id))
            .filter(|stored| stored.channel == channel)
            .map(|stored| stored.content.text.clone())
            .collect()
    }

    /// Texts of all private messages sent to `user`, oldest first.
    pub fn private_texts(&self, user: UserId) -> Vec<String> {
        let state = self.lock();
        state
            .order
            .iter()
            .filter_map(|id| state.messages.get(id))
            .filter(|stored| state.private_channels.get(&stored.channel) == Some(&user))
            .map(|stored| stored.content.text.clone())
            .collect()
    }

    /// Ids of all private messages sent to `user`, oldest first.
    pub fn private_messages(&self, user: UserId) -> Vec<MessageId> {
        let state = self.lock();
        state
            .order
            .iter()
            .copied()
            .filter(|id| {
                state
                    .messages
                    .get(id)
                    .is_some_and(|stored| state.private_channels.get(&stored.channel) == Some(&user))
            })
            .collect()
    }

    /// Whether interactions on `message` are still being delivered.
    pub fn has_open_interactions(&self, message: MessageId) -> bool {
        self.lock().queues.contains_key(&message)
    }

    /// Every acknowledgement made so far, in order.
    pub fn acknowledgements(&self) -> Vec<(Interaction, Acknowledgement)> {
        self.lock().acknowledgements.clone()
    }
}

#[async_trait]
impl Messenger for InMemoryMessenger {
    async fn render_message(
        &self,
        channel: ChannelId,
        content: &MessageContent,
    ) -> Result<MessageHandle, MessagingError> {
        Ok(self.lock().post(channel, content))
    }

    async fn edit_message(
        &self,
        handle: &MessageHandle,
        content: &MessageContent,
    ) -> Result<(), MessagingError> {
        let mut state = self.lock();
        if state.fail_edits {
            return Err(MessagingError::Transport("edit rejected".to_owned()));
        }
        match state.messages.get_mut(&handle.message) {
            Some(stored) if !stored.deleted => {
                stored.content = content.clone();
                stored.edits = stored.edits.saturating_add(1);
                Ok(())
            }
            _ => Err(MessagingError::UnknownMessage { handle: *handle }),
        }
    }

    async fn delete_message(&self, handle: &MessageHandle) -> Result<(), MessagingError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        match state.messages.get_mut(&handle.message) {
            Some(stored) if !stored.deleted => {
                stored.deleted = true;
                state.queues.remove(&handle.message);
                Ok(())
            }
            _ => Err(MessagingError::UnknownMessage { handle: *handle }),
        }
    }

    async fn await_next_interaction(
        &self,
        handle: &MessageHandle,
        timeout: Duration,
    ) -> Result<Option<Interaction>, MessagingError> {
        let rx = {
            let mut state = self.lock();
            if !state.messages.contains_key(&handle.message) {
                return Err(MessagingError::UnknownMessage { handle: *handle });
            }
            state.queue(handle.message).rx
        };
        let mut rx = rx.lock().await;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(interaction)) => Ok(Some(interaction)),
            Ok(None) => Err(MessagingError::UnknownMessage { handle: *handle }),
            Err(_elapsed) => Ok(None),
        }
    }

    async fn acknowledge_interaction(
        &self,
        interaction: &Interaction,
        acknowledgement: Acknowledgement,
    ) -> Result<(), MessagingError> {
        self.lock()
            .acknowledgements
            .push((interaction.clone(), acknowledgement));
        Ok(())
    }

    async fn open_private_channel(&self, user: UserId) -> Result<ChannelId, MessagingError> {
        let mut state = self.lock();
        if state.unreachable.contains(&user) {
            return Err(MessagingError::Unreachable {
                user,
                message: "user does not accept direct messages".to_owned(),
            });
        }
        let existing = state
            .private_channels
            .iter()
            .find(|(_, owner)| **owner == user)
            .map(|(channel, _)| *channel);
        if let Some(channel) = existing {
            return Ok(channel);
        }
        let channel = ChannelId::new(state.allocate_id());
        state.private_channels.insert(channel, user);
        Ok(channel)
    }

    async fn send_message(
        &self,
        channel: ChannelId,
        content: &MessageContent,
    ) -> Result<MessageHandle, MessagingError> {
        let mut state = self.lock();
        let recipient = state.private_channels.get(&channel).copied();
        if let Some(user) = recipient {
            if state.unreachable.contains(&user) {
                return Err(MessagingError::Unreachable {
                    user,
                    message: "user does not accept direct messages".to_owned(),
                });
            }
        }
        let handle = state.post(channel, content);
        if let Some(user) = recipient.filter(|user| state.auto_confirm.contains(user)) {
            let ready = crate::content::ready_control_id(user);
            if content.controls.iter().any(|control| control.id == ready) {
                state.enqueue(handle.message, &ready, user);
            }
        }
        Ok(handle)
    }

    async fn resolve_channel_by_name(
        &self,
        guild: GuildId,
        name: &str,
        kind: ChannelKind,
    ) -> Result<Option<Channel>, MessagingError> {
        Ok(self
            .lock()
            .channels
            .iter()
            .find(|(owner, channel)| *owner == guild && channel.name == name && channel.kind == kind)
            .map(|(_, channel)| channel.clone()))
    }

    async fn resolve_member(&self, guild: GuildId, user: UserId) -> Result<Member, MessagingError> {
        let delay = self.lock().member_lookup_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.lock()
            .members
            .get(&user)
            .map(|name| Member::new(user, name.clone()))
            .ok_or(MessagingError::UnknownMember { guild, user })
    }

    async fn close_interactions(&self, handle: &MessageHandle) {
        self.lock().queues.remove(&handle.message);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn pressed_controls_are_delivered_in_order() {
        let messenger = InMemoryMessenger::new();
        let handle = messenger
            .render_message(ChannelId::new(1), &MessageContent::text("hi"))
            .await
            .unwrap();
        messenger.press(handle.message, "a", UserId::new(1));
        messenger.press(handle.message, "b", UserId::new(2));

        let first = messenger
            .await_next_interaction(&handle, Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();
        let second = messenger
            .await_next_interaction(&handle, Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.control_id, "a");
        assert_eq!(second.user, UserId::new(2));

        let idle = messenger
            .await_next_interaction(&handle, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(idle.is_none());
    }

    #[tokio::test]
    async fn unreachable_users_cannot_be_messaged() {
        let messenger = InMemoryMessenger::new();
        messenger.set_unreachable(UserId::new(7));
        let result = messenger.open_private_channel(UserId::new(7)).await;
        assert!(matches!(result, Err(MessagingError::Unreachable { .. })));
    }

    #[tokio::test]
    async fn channel_lookup_filters_by_kind() {
        let messenger = InMemoryMessenger::new();
        let guild = GuildId::new(1);
        messenger.add_channel(guild, "Voice1", ChannelKind::Text);
        let voice = messenger.add_channel(guild, "Voice1", ChannelKind::Voice);
        let found = messenger
            .resolve_channel_by_name(guild, "Voice1", ChannelKind::Voice)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, voice);
        let missing = messenger
            .resolve_channel_by_name(GuildId::new(2), "Voice1", ChannelKind::Voice)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn edits_are_counted() {
        let messenger = InMemoryMessenger::new();
        let handle = messenger
            .render_message(ChannelId::new(1), &MessageContent::text("v1"))
            .await
            .unwrap();
        messenger
            .edit_message(&handle, &MessageContent::text("v2"))
            .await
            .unwrap();
        assert_eq!(messenger.edit_count(handle.message), 1);
        assert_eq!(messenger.content(handle.message).unwrap().text, "v2");
    }
}
