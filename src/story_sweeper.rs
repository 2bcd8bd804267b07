// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Story Sweeper
//!
//! Background task that deletes expired stories. Reads already hide a
//! story once `expires_at` passes; the sweep reclaims the records.
//!
//! ## Shutdown
//!
//! Runs until the server's `CancellationToken` fires, the same token that
//! closes realtime connections.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::storage::{Database, StoryRepository};

/// Default interval between sweeps.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

pub struct StorySweeper {
    db: Arc<Database>,
    sweep_interval: Duration,
}

impl StorySweeper {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    /// Sweep on every tick until `shutdown` is cancelled. The first tick
    /// fires immediately.
    ///
    /// ```rust,ignore
    /// tokio::spawn(StorySweeper::new(db).run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.sweep_interval.as_secs(),
            "Story sweeper starting"
        );

        let mut interval = tokio::time::interval(self.sweep_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let _ = self.sweep_step().await;
                }
                _ = shutdown.cancelled() => {
                    info!("Story sweeper shutting down");
                    return;
                }
            }
        }
    }

    /// Delete every expired story. Returns how many were removed.
    pub async fn sweep_step(&self) -> usize {
        let db = self.db.clone();
        let result =
            tokio::task::spawn_blocking(move || StoryRepository::new(&db).delete_expired(Utc::now()))
                .await;

        match result {
            Ok(Ok(0)) => {
                debug!("Story sweeper: nothing expired");
                0
            }
            Ok(Ok(removed)) => {
                info!(removed, "Story sweeper: deleted expired stories");
                removed
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Story sweeper: sweep failed");
                0
            }
            Err(e) => {
                warn!(error = %e, "Story sweeper: sweep task panicked");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{temp_database, Story};

    fn seed(db: &Database) -> Story {
        let repo = StoryRepository::new(db);
        let mut old = Story::new("alice", "old.png");
        old.expires_at = Utc::now() - chrono::Duration::seconds(1);
        repo.create(&old).unwrap();
        let live = Story::new("alice", "live.png");
        repo.create(&live).unwrap();
        live
    }

    #[tokio::test]
    async fn sweep_removes_only_expired() {
        let (db, _dir) = temp_database();
        let live = seed(&db);
        let db = Arc::new(db);

        let sweeper = StorySweeper::new(db.clone());
        assert_eq!(sweeper.sweep_step().await, 1);
        assert_eq!(sweeper.sweep_step().await, 0);
        assert!(StoryRepository::new(&db)
            .find_active(&live.id, Utc::now())
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn run_sweeps_then_stops_on_cancel() {
        let (db, _dir) = temp_database();
        seed(&db);
        let db = Arc::new(db);
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(
            StorySweeper::new(db.clone())
                .with_interval(Duration::from_millis(10))
                .run(shutdown.clone()),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();

        let counts = crate::storage::AdminRepository::new(&db).counts().unwrap();
        assert_eq!(counts.stories, 1);
    }
}
