// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Realtime dispatcher.
//!
//! Persists first, then pushes. An offline recipient simply misses the push;
//! the stored message or notification is still there on the next fetch.

use std::sync::Arc;

use tracing::debug;

use super::events::ServerEvent;
use super::registry::ConnectionRegistry;
use crate::storage::{
    AccountRepository, Database, Message, MessageRepository, Notification, NotificationRepository,
    StorageError,
};

/// Maximum message length in characters.
pub const MAX_MESSAGE_LEN: usize = 1000;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("{0}")]
    InvalidMessage(&'static str),

    #[error("recipient not found")]
    RecipientNotFound,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub struct RealtimeDispatcher {
    db: Arc<Database>,
    registry: Arc<dyn ConnectionRegistry>,
}

impl RealtimeDispatcher {
    pub fn new(db: Arc<Database>, registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { db, registry }
    }

    pub fn registry(&self) -> &Arc<dyn ConnectionRegistry> {
        &self.registry
    }

    /// Best-effort push to one account. Offline accounts are a no-op.
    pub fn deliver_to_account(&self, account_id: &str, event: ServerEvent) -> bool {
        let delivered = self.registry.deliver(account_id, event);
        if !delivered {
            debug!(account_id, "Realtime event not delivered");
        }
        delivered
    }

    /// Store a direct message and push it to the recipient.
    ///
    /// Returns the stored message so the caller can acknowledge the sender.
    pub fn send_message(
        &self,
        sender_id: &str,
        recipient_id: &str,
        content: &str,
    ) -> Result<Message, DispatchError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(DispatchError::InvalidMessage("Message content is required"));
        }
        if content.chars().count() > MAX_MESSAGE_LEN {
            return Err(DispatchError::InvalidMessage(
                "Message must not exceed 1000 characters",
            ));
        }
        if sender_id == recipient_id {
            return Err(DispatchError::InvalidMessage("Cannot message yourself"));
        }
        if AccountRepository::new(&self.db).find(recipient_id)?.is_none() {
            return Err(DispatchError::RecipientNotFound);
        }

        let message = Message::new(sender_id, recipient_id, content);
        MessageRepository::new(&self.db).create(&message)?;

        self.deliver_to_account(
            recipient_id,
            ServerEvent::ReceiveMessage {
                message: message.clone(),
            },
        );
        Ok(message)
    }

    pub fn typing(&self, sender_id: &str, recipient_id: &str) -> bool {
        self.deliver_to_account(
            recipient_id,
            ServerEvent::UserTyping {
                user_id: sender_id.to_string(),
            },
        )
    }

    pub fn stop_typing(&self, sender_id: &str, recipient_id: &str) -> bool {
        self.deliver_to_account(
            recipient_id,
            ServerEvent::UserStoppedTyping {
                user_id: sender_id.to_string(),
            },
        )
    }

    /// Store a notification and push it to its recipient.
    ///
    /// Self-notifications are suppressed and yield `None`.
    pub fn notify(&self, notification: Notification) -> Result<Option<Notification>, DispatchError> {
        if notification.recipient == notification.actor {
            return Ok(None);
        }
        NotificationRepository::new(&self.db).create(&notification)?;
        self.deliver_to_account(
            &notification.recipient,
            ServerEvent::NewNotification {
                notification: notification.clone(),
            },
        );
        Ok(Some(notification))
    }

    /// Mark the peer's messages to `reader_id` seen and tell the peer, one
    /// `message_seen` per message.
    pub fn mark_conversation_seen(
        &self,
        reader_id: &str,
        peer_id: &str,
    ) -> Result<usize, DispatchError> {
        let seen = MessageRepository::new(&self.db).mark_seen(reader_id, peer_id)?;
        for message in &seen {
            self.deliver_to_account(
                peer_id,
                ServerEvent::MessageSeen {
                    message_id: message.id.clone(),
                },
            );
        }
        Ok(seen.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::registry::{ConnectionHandle, InMemoryRegistry};
    use crate::storage::{temp_database, Account, NotificationKind};
    use tokio::sync::mpsc;
    use uuid::Uuid;

    struct Fixture {
        dispatcher: RealtimeDispatcher,
        db: Arc<Database>,
        alice: String,
        bob: String,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let (db, dir) = temp_database();
        let db = Arc::new(db);
        let accounts = AccountRepository::new(&db);
        let alice = Account::new("alice", "alice@example.com", "x".into(), "Alice");
        let bob = Account::new("bob", "bob@example.com", "x".into(), "Bob");
        accounts.create(&alice).unwrap();
        accounts.create(&bob).unwrap();

        Fixture {
            dispatcher: RealtimeDispatcher::new(db.clone(), Arc::new(InMemoryRegistry::new())),
            db,
            alice: alice.id,
            bob: bob.id,
            _dir: dir,
        }
    }

    fn connect(dispatcher: &RealtimeDispatcher, account_id: &str) -> mpsc::Receiver<ServerEvent> {
        let (tx, rx) = mpsc::channel(8);
        dispatcher
            .registry()
            .register(account_id, ConnectionHandle::new(Uuid::new_v4(), tx));
        rx
    }

    #[tokio::test]
    async fn send_message_persists_then_delivers() {
        let f = fixture();
        let mut bob_rx = connect(&f.dispatcher, &f.bob);

        let message = f.dispatcher.send_message(&f.alice, &f.bob, "  hello  ").unwrap();
        assert_eq!(message.content, "hello");

        match bob_rx.recv().await.unwrap() {
            ServerEvent::ReceiveMessage { message: pushed } => assert_eq!(pushed, message),
            other => panic!("unexpected event {other:?}"),
        }
        let stored = MessageRepository::new(&f.db).conversation(&f.alice, &f.bob, 1, 10).unwrap();
        assert_eq!(stored.messages, vec![message]);
    }

    #[test]
    fn send_to_offline_recipient_still_persists() {
        let f = fixture();
        let message = f.dispatcher.send_message(&f.alice, &f.bob, "are you there").unwrap();
        let stored = MessageRepository::new(&f.db).conversation(&f.bob, &f.alice, 1, 10).unwrap();
        assert_eq!(stored.messages[0].id, message.id);
    }

    #[test]
    fn send_message_rejects_bad_input() {
        let f = fixture();
        assert!(matches!(
            f.dispatcher.send_message(&f.alice, &f.bob, "   "),
            Err(DispatchError::InvalidMessage(_))
        ));
        assert!(matches!(
            f.dispatcher.send_message(&f.alice, &f.bob, &"x".repeat(MAX_MESSAGE_LEN + 1)),
            Err(DispatchError::InvalidMessage(_))
        ));
        assert!(matches!(
            f.dispatcher.send_message(&f.alice, "ghost", "hi"),
            Err(DispatchError::RecipientNotFound)
        ));
        assert!(matches!(
            f.dispatcher.send_message(&f.alice, &f.alice, "hi"),
            Err(DispatchError::InvalidMessage(_))
        ));
    }

    #[tokio::test]
    async fn typing_is_transient() {
        let f = fixture();
        assert!(!f.dispatcher.typing(&f.alice, &f.bob));

        let mut bob_rx = connect(&f.dispatcher, &f.bob);
        assert!(f.dispatcher.typing(&f.alice, &f.bob));
        assert!(f.dispatcher.stop_typing(&f.alice, &f.bob));
        assert_eq!(
            bob_rx.recv().await.unwrap(),
            ServerEvent::UserTyping { user_id: f.alice.clone() }
        );
        assert_eq!(
            bob_rx.recv().await.unwrap(),
            ServerEvent::UserStoppedTyping { user_id: f.alice.clone() }
        );
    }

    #[tokio::test]
    async fn notify_suppresses_self_and_pushes_others() {
        let f = fixture();
        let mut bob_rx = connect(&f.dispatcher, &f.bob);

        let own = Notification::new(&f.bob, &f.bob, NotificationKind::Like, None, None);
        assert!(f.dispatcher.notify(own).unwrap().is_none());

        let follow = Notification::new(&f.bob, &f.alice, NotificationKind::Follow, None, None);
        let stored = f.dispatcher.notify(follow).unwrap().unwrap();
        match bob_rx.recv().await.unwrap() {
            ServerEvent::NewNotification { notification } => assert_eq!(notification, stored),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(NotificationRepository::new(&f.db).list_for(&f.bob).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn seen_receipts_go_to_sender() {
        let f = fixture();
        let first = f.dispatcher.send_message(&f.alice, &f.bob, "one").unwrap();
        let second = f.dispatcher.send_message(&f.alice, &f.bob, "two").unwrap();
        let mut alice_rx = connect(&f.dispatcher, &f.alice);

        assert_eq!(f.dispatcher.mark_conversation_seen(&f.bob, &f.alice).unwrap(), 2);
        let mut ids = Vec::new();
        for _ in 0..2 {
            match alice_rx.recv().await.unwrap() {
                ServerEvent::MessageSeen { message_id } => ids.push(message_id),
                other => panic!("unexpected event {other:?}"),
            }
        }
        ids.sort();
        let mut expected = vec![first.id, second.id];
        expected.sort();
        assert_eq!(ids, expected);
    }
}
