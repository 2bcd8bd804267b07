// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Realtime Delivery
//!
//! WebSocket connections authenticated with an access token, mapped by
//! account id in a [`ConnectionRegistry`]. The [`RealtimeDispatcher`] stores
//! messages and notifications, then pushes them to the recipient's
//! connection if one is open.
//!
//! ## Wire format
//!
//! Frames are JSON text `{"event": "...", "data": {...}}`; see [`events`].

pub mod dispatcher;
pub mod events;
pub mod registry;
pub mod socket;

pub use dispatcher::{DispatchError, RealtimeDispatcher};
pub use events::{ClientEvent, ServerEvent};
pub use registry::{ConnectionHandle, ConnectionRegistry, InMemoryRegistry};
pub use socket::ws_handler;
