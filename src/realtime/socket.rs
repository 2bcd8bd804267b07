// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! WebSocket endpoint.
//!
//! The access token is checked before the upgrade (`?token=` or a Bearer
//! header); a bad token means the socket is never opened. Once open, the
//! connection is registered under its account id, outbound events flow
//! through a bounded queue drained by a writer task, and inbound frames are
//! handled in order. The mapping is removed when the client goes away or the
//! server shuts down.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::dispatcher::{DispatchError, RealtimeDispatcher};
use super::events::{ClientEvent, ServerEvent};
use super::registry::ConnectionHandle;
use crate::auth::extractor::bearer_token;
use crate::auth::AuthError;
use crate::state::AppState;

/// Per-connection outbound queue size.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// How long the writer may take to flush and close after the read side ends.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
pub struct SocketQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// Resolve the account id for a connection attempt.
///
/// The query token wins over the Authorization header.
pub fn authenticate_handshake(
    state: &AppState,
    query_token: Option<&str>,
    headers: &HeaderMap,
) -> Result<String, AuthError> {
    let token = query_token
        .filter(|t| !t.is_empty())
        .or_else(|| bearer_token(headers))
        .ok_or(AuthError::NoToken)?;
    let claims = state
        .tokens
        .verify_access(token)
        .map_err(|_| AuthError::InvalidToken)?;
    Ok(claims.sub)
}

/// Realtime connection endpoint.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<SocketQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let account_id = match authenticate_handshake(&state, query.token.as_deref(), &headers) {
        Ok(id) => id,
        Err(e) => {
            debug!(error = %e, "Socket handshake refused");
            return e.into_response();
        }
    };

    let dispatcher = state.dispatcher.clone();
    let shutdown = state.shutdown.clone();
    ws.on_upgrade(move |socket: WebSocket| async move {
        let (sink, stream) = socket.split();
        serve_connection(sink, stream, dispatcher, shutdown, account_id).await;
    })
}

/// Drive one authenticated connection until it closes or `shutdown` fires.
pub async fn serve_connection<Si, St, E>(
    mut sink: Si,
    mut stream: St,
    dispatcher: Arc<RealtimeDispatcher>,
    shutdown: CancellationToken,
    account_id: String,
) where
    Si: Sink<WsMessage> + Unpin + Send + 'static,
    St: Stream<Item = Result<WsMessage, E>> + Unpin,
    E: std::fmt::Display,
{
    let connection_id = Uuid::new_v4();
    let (outbound, mut queue) = mpsc::channel::<ServerEvent>(OUTBOUND_QUEUE_CAPACITY);
    dispatcher
        .registry()
        .register(&account_id, ConnectionHandle::new(connection_id, outbound.clone()));
    info!(account_id = %account_id, connection_id = %connection_id, "Realtime connection opened");

    let mut writer = tokio::spawn(async move {
        while let Some(event) = queue.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    error!(error = %e, "Failed to serialize socket event");
                    continue;
                }
            };
            if sink.send(WsMessage::Text(json.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });
    let mut writer_done = false;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = &mut writer => {
                writer_done = true;
                break;
            }
            frame = stream.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    handle_frame(&dispatcher, &account_id, &outbound, text.as_str());
                }
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(connection_id = %connection_id, error = %e, "Socket read failed");
                    break;
                }
            }
        }
    }

    dispatcher.registry().unregister(&account_id, connection_id);
    drop(outbound);
    if !writer_done && tokio::time::timeout(CLOSE_GRACE, &mut writer).await.is_err() {
        writer.abort();
    }
    info!(account_id = %account_id, connection_id = %connection_id, "Realtime connection closed");
}

fn handle_frame(
    dispatcher: &RealtimeDispatcher,
    account_id: &str,
    outbound: &mpsc::Sender<ServerEvent>,
    text: &str,
) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(_) => {
            reply(
                outbound,
                ServerEvent::Error {
                    message: "Unrecognized event".to_string(),
                },
            );
            return;
        }
    };

    match event {
        ClientEvent::SendMessage {
            recipient_id,
            content,
        } => match dispatcher.send_message(account_id, &recipient_id, &content) {
            Ok(message) => reply(outbound, ServerEvent::MessageSent { message }),
            Err(DispatchError::Storage(e)) => {
                error!(account_id, error = %e, "Failed to store message");
                reply(
                    outbound,
                    ServerEvent::Error {
                        message: "Failed to send message".to_string(),
                    },
                );
            }
            Err(e) => reply(
                outbound,
                ServerEvent::Error {
                    message: e.to_string(),
                },
            ),
        },
        ClientEvent::Typing { recipient_id } => {
            dispatcher.typing(account_id, &recipient_id);
        }
        ClientEvent::StopTyping { recipient_id } => {
            dispatcher.stop_typing(account_id, &recipient_id);
        }
    }
}

/// Queue an event on this connection only.
fn reply(outbound: &mpsc::Sender<ServerEvent>, event: ServerEvent) {
    if let Err(e) = outbound.try_send(event) {
        warn!(error = %e, "Socket reply dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::{Registration, SessionGrant};
    use axum::http::header::AUTHORIZATION;
    use futures::channel::mpsc as fmpsc;

    type Inbound = fmpsc::UnboundedSender<Result<WsMessage, String>>;
    type Outbound = fmpsc::UnboundedReceiver<WsMessage>;

    async fn register(state: &AppState, username: &str) -> SessionGrant {
        state
            .sessions
            .register(Registration {
                username,
                email: &format!("{username}@example.com"),
                password: "password123",
                name: username,
            })
            .await
            .unwrap()
    }

    fn open(state: &AppState, account_id: &str) -> (Inbound, Outbound, tokio::task::JoinHandle<()>) {
        let (in_tx, in_rx) = fmpsc::unbounded::<Result<WsMessage, String>>();
        let (out_tx, out_rx) = fmpsc::unbounded::<WsMessage>();
        let task = tokio::spawn(serve_connection(
            out_tx,
            in_rx,
            state.dispatcher.clone(),
            state.shutdown.clone(),
            account_id.to_string(),
        ));
        (in_tx, out_rx, task)
    }

    async fn wait_until(mut check: impl FnMut() -> bool) {
        for _ in 0..1000 {
            if check() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition not reached");
    }

    async fn next_event(outbound: &mut Outbound) -> serde_json::Value {
        match outbound.next().await {
            Some(WsMessage::Text(text)) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("unexpected frame {other:?}"),
        }
    }

    fn text(value: serde_json::Value) -> Result<WsMessage, String> {
        Ok(WsMessage::Text(value.to_string().into()))
    }

    #[tokio::test]
    async fn handshake_accepts_query_or_header() {
        let (state, _dir) = AppState::for_tests();
        let grant = register(&state, "alice").await;
        let empty = HeaderMap::new();

        let id = authenticate_handshake(&state, Some(&grant.tokens.access_token), &empty).unwrap();
        assert_eq!(id, grant.account.id);

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            format!("Bearer {}", grant.tokens.access_token).parse().unwrap(),
        );
        assert_eq!(authenticate_handshake(&state, None, &headers).unwrap(), grant.account.id);
    }

    #[tokio::test]
    async fn handshake_refuses_bad_tokens() {
        let (state, _dir) = AppState::for_tests();
        let grant = register(&state, "alice").await;
        let empty = HeaderMap::new();

        assert!(matches!(authenticate_handshake(&state, None, &empty), Err(AuthError::NoToken)));
        assert!(matches!(
            authenticate_handshake(&state, Some("garbage"), &empty),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            authenticate_handshake(&state, Some(&grant.tokens.refresh_token), &empty),
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn connection_registers_and_unregisters() {
        let (state, _dir) = AppState::for_tests();
        let alice = register(&state, "alice").await.account.id;
        let registry = state.registry.clone();

        let (inbound, _outbound, task) = open(&state, &alice);
        wait_until(|| registry.is_connected(&alice)).await;

        drop(inbound);
        task.await.unwrap();
        assert!(!registry.is_connected(&alice));
        assert!(!state.dispatcher.deliver_to_account(&alice, ServerEvent::Error {
            message: "nobody home".into()
        }));
    }

    #[tokio::test]
    async fn send_message_acks_sender_and_reaches_recipient() {
        let (state, _dir) = AppState::for_tests();
        let alice = register(&state, "alice").await.account.id;
        let bob = register(&state, "bob").await.account.id;
        let registry = state.registry.clone();

        let (alice_in, mut alice_out, alice_task) = open(&state, &alice);
        let (bob_in, mut bob_out, bob_task) = open(&state, &bob);
        wait_until(|| registry.is_connected(&alice) && registry.is_connected(&bob)).await;

        alice_in
            .unbounded_send(text(serde_json::json!({
                "event": "send_message",
                "data": {"recipientId": bob, "content": "hi bob"}
            })))
            .unwrap();

        let received = next_event(&mut bob_out).await;
        assert_eq!(received["event"], "receive_message");
        assert_eq!(received["data"]["message"]["content"], "hi bob");

        let ack = next_event(&mut alice_out).await;
        assert_eq!(ack["event"], "message_sent");
        assert_eq!(ack["data"]["message"]["id"], received["data"]["message"]["id"]);

        alice_in
            .unbounded_send(text(serde_json::json!({
                "event": "typing",
                "data": {"recipientId": bob}
            })))
            .unwrap();
        let typing = next_event(&mut bob_out).await;
        assert_eq!(typing["event"], "user_typing");
        assert_eq!(typing["data"]["userId"], alice.as_str());

        drop(alice_in);
        drop(bob_in);
        alice_task.await.unwrap();
        bob_task.await.unwrap();
    }

    #[tokio::test]
    async fn handler_errors_go_back_without_closing() {
        let (state, _dir) = AppState::for_tests();
        let alice = register(&state, "alice").await.account.id;
        let registry = state.registry.clone();

        let (alice_in, mut alice_out, task) = open(&state, &alice);
        wait_until(|| registry.is_connected(&alice)).await;

        alice_in
            .unbounded_send(text(serde_json::json!({
                "event": "send_message",
                "data": {"recipientId": "ghost", "content": "hello?"}
            })))
            .unwrap();
        let error = next_event(&mut alice_out).await;
        assert_eq!(error["event"], "error");
        assert_eq!(error["data"]["message"], "recipient not found");

        alice_in.unbounded_send(Ok(WsMessage::Text("not json".to_string().into()))).unwrap();
        assert_eq!(next_event(&mut alice_out).await["event"], "error");
        assert!(registry.is_connected(&alice));

        drop(alice_in);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_closes_connections() {
        let (state, _dir) = AppState::for_tests();
        let alice = register(&state, "alice").await.account.id;
        let registry = state.registry.clone();

        let (_alice_in, _alice_out, task) = open(&state, &alice);
        wait_until(|| registry.is_connected(&alice)).await;

        state.shutdown.cancel();
        task.await.unwrap();
        assert!(!registry.is_connected(&alice));
    }
}
