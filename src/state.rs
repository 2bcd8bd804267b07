// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::auth::{SessionManager, TokenService};
use crate::config::AppConfig;
use crate::realtime::{ConnectionRegistry, InMemoryRegistry, RealtimeDispatcher};
use crate::storage::Database;

/// Shared application state.
///
/// Cloned into every handler; all members are reference counted.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<Database>,
    pub tokens: Arc<TokenService>,
    pub sessions: Arc<SessionManager>,
    /// Live realtime connections, owned here rather than in a global.
    pub registry: Arc<dyn ConnectionRegistry>,
    pub dispatcher: Arc<RealtimeDispatcher>,
    /// Cancelled on shutdown; open sockets close when it fires.
    pub shutdown: CancellationToken,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: AppConfig, db: Database) -> Self {
        Self::with_registry(config, db, Arc::new(InMemoryRegistry::new()))
    }

    /// Build the state around a given connection registry.
    pub fn with_registry(
        config: AppConfig,
        db: Database,
        registry: Arc<dyn ConnectionRegistry>,
    ) -> Self {
        let db = Arc::new(db);
        let tokens = Arc::new(TokenService::from_config(&config));
        let sessions = Arc::new(SessionManager::new(
            db.clone(),
            tokens.clone(),
            config.reset_ttl,
        ));
        let dispatcher = Arc::new(RealtimeDispatcher::new(db.clone(), registry.clone()));

        Self {
            config: Arc::new(config),
            db,
            tokens,
            sessions,
            registry,
            dispatcher,
            shutdown: CancellationToken::new(),
            started_at: Instant::now(),
        }
    }

    /// State over a throwaway database. Keep the `TempDir` alive for the
    /// duration of the test.
    #[cfg(test)]
    pub fn for_tests() -> (Self, tempfile::TempDir) {
        let (db, dir) = crate::storage::temp_database();
        (Self::new(AppConfig::for_tests(), db), dir)
    }
}
