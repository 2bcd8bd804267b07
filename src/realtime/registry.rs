// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Connection registry: account id → live connection.
//!
//! One handle per account; a newer connection replaces the older one for
//! delivery. Delivery is best effort: `try_send` into the connection's
//! bounded queue, never awaiting a slow client.
//!
//! Disconnect removes the account's mapping only while it still names the
//! closing connection. A replaced connection that closes late therefore
//! leaves its successor registered and reachable.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};
use uuid::Uuid;

use super::events::ServerEvent;

/// Outbound side of one live connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub connection_id: Uuid,
    sender: mpsc::Sender<ServerEvent>,
}

impl ConnectionHandle {
    pub fn new(connection_id: Uuid, sender: mpsc::Sender<ServerEvent>) -> Self {
        Self {
            connection_id,
            sender,
        }
    }
}

/// Mapping from authenticated accounts to their live connection.
///
/// Implementations must be shareable across tasks; a distributed registry
/// can replace [`InMemoryRegistry`] without touching callers.
pub trait ConnectionRegistry: Send + Sync {
    /// Register a connection, replacing any earlier one for the account.
    fn register(&self, account_id: &str, handle: ConnectionHandle);

    /// Remove the account's mapping if it still points at `connection_id`.
    ///
    /// Returns `true` when a mapping was removed.
    fn unregister(&self, account_id: &str, connection_id: Uuid) -> bool;

    fn is_connected(&self, account_id: &str) -> bool;

    /// Push an event to the account's connection.
    ///
    /// Returns `false` when the account is offline or the event was dropped.
    fn deliver(&self, account_id: &str, event: ServerEvent) -> bool;

    /// Number of accounts with a registered connection.
    fn connected_count(&self) -> usize;
}

/// Process-local registry.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    connections: RwLock<HashMap<String, ConnectionHandle>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConnectionRegistry for InMemoryRegistry {
    fn register(&self, account_id: &str, handle: ConnectionHandle) {
        let mut connections = self.connections.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = connections.insert(account_id.to_string(), handle) {
            debug!(
                account_id,
                connection_id = %previous.connection_id,
                "Connection superseded"
            );
        }
    }

    fn unregister(&self, account_id: &str, connection_id: Uuid) -> bool {
        let mut connections = self.connections.write().unwrap_or_else(PoisonError::into_inner);
        match connections.get(account_id) {
            Some(current) if current.connection_id == connection_id => {
                connections.remove(account_id);
                true
            }
            _ => false,
        }
    }

    fn is_connected(&self, account_id: &str) -> bool {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(account_id)
    }

    fn deliver(&self, account_id: &str, event: ServerEvent) -> bool {
        let handle = self
            .connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(account_id)
            .cloned();
        let Some(handle) = handle else {
            return false;
        };

        let name = event.name();
        match handle.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(
                    account_id,
                    connection_id = %handle.connection_id,
                    event = name,
                    "Outbound queue full, event dropped"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.unregister(account_id, handle.connection_id);
                false
            }
        }
    }

    fn connected_count(&self) -> usize {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
