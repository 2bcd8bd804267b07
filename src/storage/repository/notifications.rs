// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Notification repository.

use chrono::{DateTime, Utc};
use redb::ReadableDatabase;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{
    encode_record, scan_keyed, scan_records, Database, StorageResult, NOTIFICATIONS,
};

/// What the actor did.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
    Comment,
    Follow,
    Repost,
}

/// Notification stored in the `notifications` table.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub recipient: String,
    pub actor: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub post: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        recipient: &str,
        actor: &str,
        kind: NotificationKind,
        post: Option<String>,
        comment: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            recipient: recipient.to_string(),
            actor: actor.to_string(),
            kind,
            post,
            comment,
            read: false,
            created_at: Utc::now(),
        }
    }
}

/// Repository for notification operations.
pub struct NotificationRepository<'a> {
    db: &'a Database,
}

impl<'a> NotificationRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn create(&self, notification: &Notification) -> StorageResult<()> {
        let json = encode_record(notification)?;
        let write_txn = self.db.raw().begin_write()?;
        {
            let mut table = write_txn.open_table(NOTIFICATIONS)?;
            table.insert(notification.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Notifications addressed to `recipient`, newest first.
    pub fn list_for(&self, recipient: &str) -> StorageResult<Vec<Notification>> {
        let read_txn = self.db.raw().begin_read()?;
        let table = read_txn.open_table(NOTIFICATIONS)?;
        let mut notifications: Vec<Notification> = scan_records(&table)?;
        notifications.retain(|n| n.recipient == recipient);
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    pub fn unread_count(&self, recipient: &str) -> StorageResult<usize> {
        Ok(self
            .list_for(recipient)?
            .iter()
            .filter(|n| !n.read)
            .count())
    }

    /// Mark every unread notification of `recipient` read. Returns how many changed.
    pub fn mark_all_read(&self, recipient: &str) -> StorageResult<usize> {
        let write_txn = self.db.raw().begin_write()?;
        let changed = {
            let mut table = write_txn.open_table(NOTIFICATIONS)?;
            let unread: Vec<(String, Notification)> = scan_keyed::<Notification, _>(&table)?
                .into_iter()
                .filter(|(_, n)| n.recipient == recipient && !n.read)
                .collect();
            for (key, mut notification) in unread.iter().cloned() {
                notification.read = true;
                table.insert(key.as_str(), encode_record(&notification)?.as_slice())?;
            }
            unread.len()
        };
        write_txn.commit()?;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::temp_database;

    #[test]
    fn list_unread_and_mark_read() {
        let (db, _dir) = temp_database();
        let repo = NotificationRepository::new(&db);
        repo.create(&Notification::new("bob", "alice", NotificationKind::Follow, None, None))
            .unwrap();
        repo.create(&Notification::new(
            "bob",
            "carol",
            NotificationKind::Like,
            Some("post-1".to_string()),
            None,
        ))
        .unwrap();
        repo.create(&Notification::new("alice", "bob", NotificationKind::Follow, None, None))
            .unwrap();

        let listed = repo.list_for("bob").unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].created_at >= listed[1].created_at);
        assert_eq!(repo.unread_count("bob").unwrap(), 2);

        assert_eq!(repo.mark_all_read("bob").unwrap(), 2);
        assert_eq!(repo.unread_count("bob").unwrap(), 0);
        assert_eq!(repo.unread_count("alice").unwrap(), 1);
        assert_eq!(repo.mark_all_read("bob").unwrap(), 0);
    }

    #[test]
    fn kind_serializes_under_type() {
        let n = Notification::new("bob", "alice", NotificationKind::Repost, None, None);
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "repost");
        assert_eq!(json["read"], false);
        assert!(json.get("createdAt").is_some());
    }
}
