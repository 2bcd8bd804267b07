// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Social - Session and Realtime Server
//!
//! Account sessions (register, login, refresh, password reset) and a
//! realtime connection registry for direct messages and activity
//! notifications, backed by an embedded redb database.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token issuance, verification and access gates
//! - `realtime` - WebSocket connections, registry and event dispatch
//! - `storage` - redb-backed repositories
//! - `story_sweeper` - Background removal of expired stories

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod realtime;
pub mod state;
pub mod storage;
pub mod story_sweeper;
pub mod telemetry;
