// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Moderation audit log.
//!
//! Every admin deletion leaves an [`AdminLog`] entry. Entries are written
//! by the cascades in [`super::admin`] inside the same write transaction as
//! the deletion, so a log line exists exactly when the deletion committed.

use chrono::{DateTime, Utc};
use redb::ReadableDatabase;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{
    encode_record, scan_records, Database, RecordTable, StorageResult, ADMIN_LOGS,
};

/// Moderation action taken by an admin.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    DeletePost,
    DeleteComment,
    DeleteUser,
}

/// Kind of record a moderation action removed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Post,
    Comment,
    User,
}

impl AdminAction {
    pub fn target_type(self) -> TargetType {
        match self {
            Self::DeletePost => TargetType::Post,
            Self::DeleteComment => TargetType::Comment,
            Self::DeleteUser => TargetType::User,
        }
    }
}

/// Audit entry stored in the `admin_logs` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminLog {
    pub id: String,
    /// Admin account that acted
    pub admin: String,
    pub action: AdminAction,
    pub target_type: TargetType,
    pub target_id: String,
    /// Trimmed free-text reason; empty when none was given
    #[serde(default)]
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl AdminLog {
    pub fn new(admin: &str, action: AdminAction, target_id: &str, reason: Option<&str>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            admin: admin.to_string(),
            action,
            target_type: action.target_type(),
            target_id: target_id.to_string(),
            reason: reason.map(str::trim).unwrap_or_default().to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Insert an entry through an already-open `admin_logs` table.
pub(super) fn append(logs: &mut RecordTable<'_>, entry: &AdminLog) -> StorageResult<()> {
    logs.insert(entry.id.as_str(), encode_record(entry)?.as_slice())?;
    Ok(())
}

/// One page of the audit log and the total entry count.
#[derive(Debug, Clone)]
pub struct AdminLogPage {
    pub entries: Vec<AdminLog>,
    pub total: usize,
}

pub struct AuditRepository<'a> {
    db: &'a Database,
}

impl<'a> AuditRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Entries newest first. `page` starts at 1.
    pub fn list(&self, page: usize, limit: usize) -> StorageResult<AdminLogPage> {
        let read_txn = self.db.raw().begin_read()?;
        let table = read_txn.open_table(ADMIN_LOGS)?;
        let mut entries: Vec<AdminLog> = scan_records(&table)?;
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = entries.len();
        let skip = page.saturating_sub(1).saturating_mul(limit);
        let entries = entries.into_iter().skip(skip).take(limit).collect();
        Ok(AdminLogPage { entries, total })
    }
}
