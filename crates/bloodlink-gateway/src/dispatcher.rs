use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock, mpsc};
use tracing::debug;
use uuid::Uuid;

use bloodlink_types::events::{ActionButton, GatewayEvent, MessageRef, UserEvent};
use bloodlink_types::models::UserHandle;

use crate::{GatewayError, MessagingGateway};

/// Messages held for a user who is not connected.
pub const MAILBOX_CAPACITY: usize = 64;

/// Routes outgoing messages to connected chat users and inbound events to
/// the engine.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Per-user targeted send channels: user -> (conn_id, sender)
    user_channels: RwLock<HashMap<UserHandle, (Uuid, mpsc::UnboundedSender<GatewayEvent>)>>,

    /// Undelivered events for offline users, flushed on connect
    mailboxes: Mutex<HashMap<UserHandle, VecDeque<GatewayEvent>>>,

    /// Public handles announced in Identify
    public_handles: RwLock<HashMap<UserHandle, String>>,

    /// Inbound user events, consumed by the engine loop
    events_tx: mpsc::Sender<UserEvent>,
}

impl Dispatcher {
    pub fn new(events_tx: mpsc::Sender<UserEvent>) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                user_channels: RwLock::new(HashMap::new()),
                mailboxes: Mutex::new(HashMap::new()),
                public_handles: RwLock::new(HashMap::new()),
                events_tx,
            }),
        }
    }

    /// Register a per-user targeted channel, replacing any older connection.
    /// Mailbox contents are queued on the new channel before it is returned.
    pub async fn register_user_channel(
        &self,
        user: UserHandle,
    ) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut channels = self.inner.user_channels.write().await;
        if let Some(pending) = self.inner.mailboxes.lock().await.remove(&user) {
            debug!("Flushing {} queued messages to user {}", pending.len(), user);
            for event in pending {
                let _ = tx.send(event);
            }
        }
        channels.insert(user, (conn_id, tx));

        (conn_id, rx)
    }

    /// Unregister a per-user targeted channel, but only if conn_id matches.
    pub async fn unregister_user_channel(&self, user: UserHandle, conn_id: Uuid) {
        let mut channels = self.inner.user_channels.write().await;
        if channels.get(&user).is_some_and(|(stored, _)| *stored == conn_id) {
            channels.remove(&user);
        }
    }

    pub async fn is_online(&self, user: UserHandle) -> bool {
        self.inner.user_channels.read().await.contains_key(&user)
    }

    pub async fn set_public_handle(&self, user: UserHandle, handle: Option<String>) {
        let mut handles = self.inner.public_handles.write().await;
        match handle.map(|h| h.trim().trim_start_matches('@').to_string()) {
            Some(h) if !h.is_empty() => {
                handles.insert(user, h);
            }
            _ => {
                handles.remove(&user);
            }
        }
    }

    /// Hand an inbound event to the engine.
    pub async fn publish(&self, event: UserEvent) -> Result<(), GatewayError> {
        self.inner
            .events_tx
            .send(event)
            .await
            .map_err(|_| GatewayError::Closed)
    }

    /// Send a targeted event to a user, queueing it if they are offline.
    pub async fn deliver(&self, user: UserHandle, event: GatewayEvent) -> Result<(), GatewayError> {
        // Held across the mailbox push so a concurrent connect cannot miss it.
        let channels = self.inner.user_channels.read().await;

        let event = match channels.get(&user) {
            Some((_, tx)) => match tx.send(event) {
                Ok(()) => return Ok(()),
                Err(mpsc::error::SendError(event)) => event,
            },
            None => event,
        };

        let mut mailboxes = self.inner.mailboxes.lock().await;
        let mailbox = mailboxes.entry(user).or_default();
        if mailbox.len() >= MAILBOX_CAPACITY {
            return Err(GatewayError::MailboxFull(user));
        }
        mailbox.push_back(event);
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for Dispatcher {
    async fn send_message(
        &self,
        user: UserHandle,
        text: &str,
        actions: &[ActionButton],
    ) -> Result<MessageRef, GatewayError> {
        let message_id = Uuid::new_v4();
        self.deliver(
            user,
            GatewayEvent::Message {
                message_id,
                text: text.to_string(),
                actions: actions.to_vec(),
            },
        )
        .await?;
        Ok(MessageRef { user, message_id })
    }

    async fn edit_message(
        &self,
        message: MessageRef,
        text: &str,
        actions: &[ActionButton],
    ) -> Result<(), GatewayError> {
        self.deliver(
            message.user,
            GatewayEvent::MessageEdit {
                message_id: message.message_id,
                text: text.to_string(),
                actions: actions.to_vec(),
            },
        )
        .await
    }

    async fn resolve_public_handle(&self, user: UserHandle) -> Result<Option<String>, GatewayError> {
        Ok(self.inner.public_handles.read().await.get(&user).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher() -> (Dispatcher, mpsc::Receiver<UserEvent>) {
        let (tx, rx) = mpsc::channel(8);
        (Dispatcher::new(tx), rx)
    }

    #[tokio::test]
    async fn offline_messages_are_flushed_on_connect() {
        let (dispatcher, _events) = dispatcher();
        let user = UserHandle(5);

        let sent = dispatcher.send_message(user, "hello", &[]).await.unwrap();
        assert_eq!(sent.user, user);
        assert!(!dispatcher.is_online(user).await);

        let (_conn, mut rx) = dispatcher.register_user_channel(user).await;
        match rx.recv().await {
            Some(GatewayEvent::Message { message_id, text, .. }) => {
                assert_eq!(message_id, sent.message_id);
                assert_eq!(text, "hello");
            }
            other => panic!("expected queued message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn full_mailbox_is_a_delivery_failure() {
        let (dispatcher, _events) = dispatcher();
        let user = UserHandle(9);

        for _ in 0..MAILBOX_CAPACITY {
            dispatcher.send_message(user, "offer", &[]).await.unwrap();
        }
        let err = dispatcher.send_message(user, "one too many", &[]).await;
        assert!(matches!(err, Err(GatewayError::MailboxFull(u)) if u == user));
    }

    #[tokio::test]
    async fn edits_reach_the_connected_user() {
        let (dispatcher, _events) = dispatcher();
        let user = UserHandle(1);
        let (_conn, mut rx) = dispatcher.register_user_channel(user).await;

        let message = dispatcher.send_message(user, "offer", &[]).await.unwrap();
        dispatcher.edit_message(message, "accepted", &[]).await.unwrap();

        assert!(matches!(rx.recv().await, Some(GatewayEvent::Message { .. })));
        match rx.recv().await {
            Some(GatewayEvent::MessageEdit { message_id, text, .. }) => {
                assert_eq!(message_id, message.message_id);
                assert_eq!(text, "accepted");
            }
            other => panic!("expected edit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn stale_connection_does_not_unregister_newer_one() {
        let (dispatcher, _events) = dispatcher();
        let user = UserHandle(3);

        let (old, _old_rx) = dispatcher.register_user_channel(user).await;
        let (_new, _new_rx) = dispatcher.register_user_channel(user).await;
        dispatcher.unregister_user_channel(user, old).await;

        assert!(dispatcher.is_online(user).await);
    }

    #[tokio::test]
    async fn public_handles_are_normalized() {
        let (dispatcher, _events) = dispatcher();
        let user = UserHandle(2);

        dispatcher.set_public_handle(user, Some(" @rahim ".into())).await;
        assert_eq!(
            dispatcher.resolve_public_handle(user).await.unwrap().as_deref(),
            Some("rahim")
        );

        dispatcher.set_public_handle(user, Some("  ".into())).await;
        assert_eq!(dispatcher.resolve_public_handle(user).await.unwrap(), None);
    }

    #[tokio::test]
    async fn published_events_reach_the_engine_channel() {
        let (dispatcher, mut events) = dispatcher();
        let event = UserEvent::TextReceived {
            text: "Rahim".into(),
            user: UserHandle(4),
        };
        dispatcher.publish(event.clone()).await.unwrap();
        assert_eq!(events.recv().await, Some(event));
    }
}
