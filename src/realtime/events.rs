// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Socket event wire format.
//!
//! Every frame is a JSON text message `{"event": "<name>", "data": {...}}`.

use serde::{Deserialize, Serialize};

use crate::storage::{Message, Notification};

/// Events a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    SendMessage { recipient_id: String, content: String },
    Typing { recipient_id: String },
    StopTyping { recipient_id: String },
}

/// Events the server pushes to a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// New message for the recipient
    ReceiveMessage { message: Message },
    /// Stored form of a message, back to its sender
    MessageSent { message: Message },
    UserTyping { user_id: String },
    UserStoppedTyping { user_id: String },
    NewNotification { notification: Notification },
    /// A message this account sent was seen by its recipient
    MessageSeen { message_id: String },
    /// Handler failure, reported to the originating connection only
    Error { message: String },
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::ReceiveMessage { .. } => "receive_message",
            ServerEvent::MessageSent { .. } => "message_sent",
            ServerEvent::UserTyping { .. } => "user_typing",
            ServerEvent::UserStoppedTyping { .. } => "user_stopped_typing",
            ServerEvent::NewNotification { .. } => "new_notification",
            ServerEvent::MessageSeen { .. } => "message_seen",
            ServerEvent::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_events_parse() {
        let send: ClientEvent = serde_json::from_value(json!({
            "event": "send_message",
            "data": {"recipientId": "bob", "content": "hi"}
        }))
        .unwrap();
        assert_eq!(
            send,
            ClientEvent::SendMessage {
                recipient_id: "bob".into(),
                content: "hi".into()
            }
        );

        let stop: ClientEvent = serde_json::from_value(json!({
            "event": "stop_typing",
            "data": {"recipientId": "bob"}
        }))
        .unwrap();
        assert_eq!(stop, ClientEvent::StopTyping { recipient_id: "bob".into() });
    }

    #[test]
    fn unknown_client_event_is_rejected() {
        let result = serde_json::from_value::<ClientEvent>(json!({"event": "shout", "data": {}}));
        assert!(result.is_err());
    }

    #[test]
    fn server_event_shape() {
        let event = ServerEvent::MessageSeen { message_id: "m1".into() };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"event": "message_seen", "data": {"messageId": "m1"}})
        );
        assert_eq!(event.name(), "message_seen");

        let typing = ServerEvent::UserTyping { user_id: "alice".into() };
        assert_eq!(
            serde_json::to_value(&typing).unwrap(),
            json!({"event": "user_typing", "data": {"userId": "alice"}})
        );
    }
}
