// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Persistent Entity Store
//!
//! Embedded database backed by redb (pure Rust, ACID). Every entity is a
//! JSON-serialized record keyed by its id; secondary tables map indexed
//! fields back to ids.
//!
//! ## Table Layout
//!
//! - `accounts`: account_id → Account
//! - `account_usernames`: folded username → account_id
//! - `account_emails`: folded email → account_id
//! - `reset_tickets`: reset ticket hash → account_id
//! - `posts`: post_id → Post
//! - `comments`: comment_id → Comment
//! - `messages`: message_id → Message
//! - `notifications`: notification_id → Notification
//! - `stories`: story_id → Story
//! - `admin_logs`: log_id → AdminLog
//!
//! Repositories in [`repository`] provide typed access on top of [`Database`].

use std::path::Path;

use redb::{ReadableTable, TableDefinition};
use serde::{de::DeserializeOwned, Serialize};

pub mod repository;

pub use repository::{
    Account, AccountPurge, AccountRepository, AdminAction, AdminLog, AdminLogPage,
    AdminRepository, AuditRepository, Comment, CommentRepository, ConversationPage,
    ConversationSummary, EntityCounts, Message, MessageRepository, Notification,
    NotificationKind, NotificationRepository, Post, PostPage, PostRepository, Story,
    StoryRepository, TargetType, STORY_LIFETIME_HOURS,
};

// =============================================================================
// Table Definitions
// =============================================================================

pub(crate) const ACCOUNTS: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");
pub(crate) const ACCOUNT_USERNAMES: TableDefinition<&str, &str> =
    TableDefinition::new("account_usernames");
pub(crate) const ACCOUNT_EMAILS: TableDefinition<&str, &str> =
    TableDefinition::new("account_emails");
pub(crate) const RESET_TICKETS: TableDefinition<&str, &str> = TableDefinition::new("reset_tickets");
pub(crate) const POSTS: TableDefinition<&str, &[u8]> = TableDefinition::new("posts");
pub(crate) const COMMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("comments");
pub(crate) const MESSAGES: TableDefinition<&str, &[u8]> = TableDefinition::new("messages");
pub(crate) const NOTIFICATIONS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("notifications");
pub(crate) const STORIES: TableDefinition<&str, &[u8]> = TableDefinition::new("stories");
pub(crate) const ADMIN_LOGS: TableDefinition<&str, &[u8]> = TableDefinition::new("admin_logs");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    /// A unique index already holds the value; carries the field name.
    #[error("already exists: {0}")]
    AlreadyExists(&'static str),
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Database
// =============================================================================

/// Embedded ACID entity database.
pub struct Database {
    db: redb::Database,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = redb::Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ACCOUNTS)?;
            let _ = write_txn.open_table(ACCOUNT_USERNAMES)?;
            let _ = write_txn.open_table(ACCOUNT_EMAILS)?;
            let _ = write_txn.open_table(RESET_TICKETS)?;
            let _ = write_txn.open_table(POSTS)?;
            let _ = write_txn.open_table(COMMENTS)?;
            let _ = write_txn.open_table(MESSAGES)?;
            let _ = write_txn.open_table(NOTIFICATIONS)?;
            let _ = write_txn.open_table(STORIES)?;
            let _ = write_txn.open_table(ADMIN_LOGS)?;
        }
        write_txn.commit()?;

        tracing::info!(path = %path.display(), "Entity database opened");
        Ok(Self { db })
    }

    /// Open a read transaction against the accounts table.
    pub fn health_check(&self) -> StorageResult<()> {
        use redb::ReadableDatabase;

        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(ACCOUNTS)?;
        Ok(())
    }

    pub(crate) fn raw(&self) -> &redb::Database {
        &self.db
    }
}

// =============================================================================
// Record Helpers
// =============================================================================

/// Writable record table inside a write transaction.
pub(crate) type RecordTable<'txn> = redb::Table<'txn, &'static str, &'static [u8]>;

/// Writable index table inside a write transaction.
pub(crate) type IndexTable<'txn> = redb::Table<'txn, &'static str, &'static str>;

/// Read and deserialize a single JSON record.
pub(crate) fn read_record<T, R>(table: &R, key: &str) -> StorageResult<Option<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(key)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

/// Deserialize every record of a table, in key order.
pub(crate) fn scan_records<T, R>(table: &R) -> StorageResult<Vec<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static [u8]>,
{
    let mut records = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        records.push(serde_json::from_slice(value.value())?);
    }
    Ok(records)
}

/// Deserialize every record of a table together with its key.
pub(crate) fn scan_keyed<T, R>(table: &R) -> StorageResult<Vec<(String, T)>>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static [u8]>,
{
    let mut records = Vec::new();
    for entry in table.iter()? {
        let (key, value) = entry?;
        records.push((key.value().to_string(), serde_json::from_slice(value.value())?));
    }
    Ok(records)
}

/// Serialize a record for insertion.
pub(crate) fn encode_record<T: Serialize>(record: &T) -> StorageResult<Vec<u8>> {
    Ok(serde_json::to_vec(record)?)
}

/// Look up an index entry (e.g. username → account_id).
pub(crate) fn read_index<R>(table: &R, key: &str) -> StorageResult<Option<String>>
where
    R: ReadableTable<&'static str, &'static str>,
{
    Ok(table.get(key)?.map(|v| v.value().to_string()))
}

#[cfg(test)]
pub(crate) fn temp_database() -> (Database, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("test.redb")).unwrap();
    (db, dir)
}
