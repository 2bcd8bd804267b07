// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Direct message repository.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use redb::ReadableDatabase;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{encode_record, scan_keyed, scan_records, Database, StorageResult, MESSAGES};

/// Direct message stored in the `messages` table.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender: String,
    pub recipient: String,
    pub content: String,
    #[serde(default)]
    pub seen: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(sender: &str, recipient: &str, content: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            content: content.trim().to_string(),
            seen: false,
            created_at: Utc::now(),
        }
    }

    fn involves(&self, a: &str, b: &str) -> bool {
        (self.sender == a && self.recipient == b) || (self.sender == b && self.recipient == a)
    }
}

/// Latest message and unread count for one conversation partner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub peer_id: String,
    pub last_message: Message,
    pub unread_count: usize,
}

/// One page of a conversation.
#[derive(Debug, Clone)]
pub struct ConversationPage {
    /// Messages of the page, oldest first.
    pub messages: Vec<Message>,
    pub total: usize,
}

/// Repository for message operations.
pub struct MessageRepository<'a> {
    db: &'a Database,
}

impl<'a> MessageRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn create(&self, message: &Message) -> StorageResult<()> {
        let json = encode_record(message)?;
        let write_txn = self.db.raw().begin_write()?;
        {
            let mut table = write_txn.open_table(MESSAGES)?;
            table.insert(message.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn all(&self) -> StorageResult<Vec<Message>> {
        let read_txn = self.db.raw().begin_read()?;
        let table = read_txn.open_table(MESSAGES)?;
        scan_records(&table)
    }

    /// Page through the conversation between `account_id` and `peer_id`.
    ///
    /// Pages count back from the newest message (`page` starts at 1); the
    /// messages inside a page are returned oldest first.
    pub fn conversation(
        &self,
        account_id: &str,
        peer_id: &str,
        page: usize,
        limit: usize,
    ) -> StorageResult<ConversationPage> {
        let mut messages: Vec<Message> = self
            .all()?
            .into_iter()
            .filter(|m| m.involves(account_id, peer_id))
            .collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = messages.len();

        let skip = page.saturating_sub(1).saturating_mul(limit);
        let mut page: Vec<Message> = messages.into_iter().skip(skip).take(limit).collect();
        page.reverse();
        Ok(ConversationPage { messages: page, total })
    }

    /// One summary per conversation partner, most recent conversation first.
    pub fn conversations(&self, account_id: &str) -> StorageResult<Vec<ConversationSummary>> {
        let mut by_peer: HashMap<String, ConversationSummary> = HashMap::new();
        for message in self.all()? {
            let peer = if message.sender == account_id {
                message.recipient.clone()
            } else if message.recipient == account_id {
                message.sender.clone()
            } else {
                continue;
            };
            let unread = usize::from(message.recipient == account_id && !message.seen);

            match by_peer.get_mut(&peer) {
                Some(summary) => {
                    summary.unread_count += unread;
                    if message.created_at > summary.last_message.created_at {
                        summary.last_message = message;
                    }
                }
                None => {
                    by_peer.insert(
                        peer.clone(),
                        ConversationSummary {
                            peer_id: peer,
                            last_message: message,
                            unread_count: unread,
                        },
                    );
                }
            }
        }

        let mut summaries: Vec<ConversationSummary> = by_peer.into_values().collect();
        summaries.sort_by(|a, b| b.last_message.created_at.cmp(&a.last_message.created_at));
        Ok(summaries)
    }

    /// Mark every unseen message from `sender_id` to `reader_id` as seen.
    ///
    /// Returns the messages that changed state.
    pub fn mark_seen(&self, reader_id: &str, sender_id: &str) -> StorageResult<Vec<Message>> {
        let write_txn = self.db.raw().begin_write()?;
        let changed = {
            let mut table = write_txn.open_table(MESSAGES)?;
            let unseen: Vec<(String, Message)> = scan_keyed::<Message, _>(&table)?
                .into_iter()
                .filter(|(_, m)| m.sender == sender_id && m.recipient == reader_id && !m.seen)
                .collect();

            let mut changed = Vec::with_capacity(unseen.len());
            for (key, mut message) in unseen {
                message.seen = true;
                table.insert(key.as_str(), encode_record(&message)?.as_slice())?;
                changed.push(message);
            }
            changed
        };
        write_txn.commit()?;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::temp_database;

    fn send(repo: &MessageRepository<'_>, from: &str, to: &str, text: &str) -> Message {
        let message = Message::new(from, to, text);
        repo.create(&message).unwrap();
        message
    }

    #[test]
    fn conversation_pages_from_newest() {
        let (db, _dir) = temp_database();
        let repo = MessageRepository::new(&db);
        for i in 0..5 {
            send(&repo, "alice", "bob", &format!("m{i}"));
        }
        send(&repo, "alice", "carol", "elsewhere");

        let first = repo.conversation("bob", "alice", 1, 2).unwrap();
        assert_eq!(first.total, 5);
        let texts: Vec<&str> = first.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, ["m3", "m4"]);

        let last = repo.conversation("alice", "bob", 3, 2).unwrap();
        assert_eq!(last.messages.len(), 1);
        assert_eq!(last.messages[0].content, "m0");
    }

    #[test]
    fn conversations_summarise_each_peer() {
        let (db, _dir) = temp_database();
        let repo = MessageRepository::new(&db);
        send(&repo, "alice", "bob", "hi bob");
        send(&repo, "carol", "bob", "hi from carol");
        let latest = send(&repo, "bob", "alice", "hi alice");

        let summaries = repo.conversations("bob").unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].peer_id, "alice");
        assert_eq!(summaries[0].last_message.id, latest.id);
        assert_eq!(summaries[0].unread_count, 1);
        assert_eq!(summaries[1].peer_id, "carol");
    }

    #[test]
    fn mark_seen_only_touches_incoming() {
        let (db, _dir) = temp_database();
        let repo = MessageRepository::new(&db);
        send(&repo, "alice", "bob", "one");
        send(&repo, "alice", "bob", "two");
        send(&repo, "bob", "alice", "reply");

        let changed = repo.mark_seen("bob", "alice").unwrap();
        assert_eq!(changed.len(), 2);
        assert!(changed.iter().all(|m| m.seen && m.sender == "alice"));
        assert!(repo.mark_seen("bob", "alice").unwrap().is_empty());
        assert_eq!(repo.conversations("alice").unwrap()[0].unread_count, 1);
    }
}
