// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the entity database.
//!
//! Each repository borrows the [`Database`](super::Database) and offers the
//! operations for one entity type. Multi-record changes run inside a single
//! redb write transaction.

pub mod accounts;
pub mod admin;
pub mod audit;
pub mod messages;
pub mod notifications;
pub mod posts;
pub mod stories;

pub use accounts::{Account, AccountRepository};
pub use admin::{AccountPurge, AdminRepository, EntityCounts};
pub use audit::{AdminAction, AdminLog, AdminLogPage, AuditRepository, TargetType};
pub use messages::{ConversationPage, ConversationSummary, Message, MessageRepository};
pub use notifications::{Notification, NotificationKind, NotificationRepository};
pub use posts::{Comment, CommentRepository, Post, PostPage, PostRepository};
pub use stories::{Story, StoryRepository, STORY_LIFETIME_HOURS};
