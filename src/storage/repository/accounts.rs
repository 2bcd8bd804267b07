// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account repository.
//!
//! Accounts are stored as JSON records in the `accounts` table. Username and
//! email are folded to lowercase and kept unique through the
//! `account_usernames` / `account_emails` index tables, which are updated in
//! the same write transaction as the record itself.

use chrono::{DateTime, Utc};
use redb::ReadableDatabase;
use serde::{Deserialize, Serialize};

use super::super::{
    encode_record, read_index, read_record, scan_records, Database, StorageError, StorageResult,
    ACCOUNTS, ACCOUNT_EMAILS, ACCOUNT_USERNAMES, RESET_TICKETS,
};

/// Account record as persisted.
///
/// Carries the password verifier and session secrets, so it is never
/// serialized to a client. Use [`crate::models::AccountView`] for that.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub profile_image: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub followers: Vec<String>,
    #[serde(default)]
    pub following: Vec<String>,
    #[serde(default)]
    pub is_admin: bool,
    /// The single refresh token currently accepted for this account.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Hash of the outstanding password reset ticket.
    #[serde(default)]
    pub reset_password_token: Option<String>,
    #[serde(default)]
    pub reset_password_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Build a fresh account. Username and email are folded to lowercase.
    pub fn new(username: &str, email: &str, password_hash: String, name: &str) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username: fold(username),
            email: fold(email),
            password_hash,
            name: name.trim().to_string(),
            bio: String::new(),
            profile_image: String::new(),
            website: String::new(),
            location: String::new(),
            followers: Vec::new(),
            following: Vec::new(),
            is_admin: false,
            refresh_token: None,
            reset_password_token: None,
            reset_password_expires: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Case-fold a username or email for storage and lookup.
pub fn fold(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Repository for account operations.
pub struct AccountRepository<'a> {
    db: &'a Database,
}

impl<'a> AccountRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a new account.
    ///
    /// Fails with `AlreadyExists("email")` or `AlreadyExists("username")`;
    /// the email index is consulted first.
    pub fn create(&self, account: &Account) -> StorageResult<()> {
        let json = encode_record(account)?;
        let write_txn = self.db.raw().begin_write()?;
        {
            let mut emails = write_txn.open_table(ACCOUNT_EMAILS)?;
            if read_index(&emails, &account.email)?.is_some() {
                return Err(StorageError::AlreadyExists("email"));
            }
            let mut usernames = write_txn.open_table(ACCOUNT_USERNAMES)?;
            if read_index(&usernames, &account.username)?.is_some() {
                return Err(StorageError::AlreadyExists("username"));
            }

            emails.insert(account.email.as_str(), account.id.as_str())?;
            usernames.insert(account.username.as_str(), account.id.as_str())?;

            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            accounts.insert(account.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get an account by id.
    pub fn get(&self, account_id: &str) -> StorageResult<Account> {
        self.find(account_id)?
            .ok_or_else(|| StorageError::NotFound(format!("Account {account_id}")))
    }

    /// Get an account by id, `None` when absent.
    pub fn find(&self, account_id: &str) -> StorageResult<Option<Account>> {
        let read_txn = self.db.raw().begin_read()?;
        let table = read_txn.open_table(ACCOUNTS)?;
        read_record(&table, account_id)
    }

    /// Find an account by (case-insensitive) email.
    pub fn find_by_email(&self, email: &str) -> StorageResult<Option<Account>> {
        let read_txn = self.db.raw().begin_read()?;
        let index = read_txn.open_table(ACCOUNT_EMAILS)?;
        let Some(id) = read_index(&index, &fold(email))? else {
            return Ok(None);
        };
        let table = read_txn.open_table(ACCOUNTS)?;
        read_record(&table, &id)
    }

    /// Find an account by (case-insensitive) username.
    pub fn find_by_username(&self, username: &str) -> StorageResult<Option<Account>> {
        let read_txn = self.db.raw().begin_read()?;
        let index = read_txn.open_table(ACCOUNT_USERNAMES)?;
        let Some(id) = read_index(&index, &fold(username))? else {
            return Ok(None);
        };
        let table = read_txn.open_table(ACCOUNTS)?;
        read_record(&table, &id)
    }

    /// Find the account holding a reset ticket hash.
    pub fn find_by_reset_hash(&self, ticket_hash: &str) -> StorageResult<Option<Account>> {
        let read_txn = self.db.raw().begin_read()?;
        let index = read_txn.open_table(RESET_TICKETS)?;
        let Some(id) = read_index(&index, ticket_hash)? else {
            return Ok(None);
        };
        let table = read_txn.open_table(ACCOUNTS)?;
        read_record(&table, &id)
    }

    /// Apply `change` to the stored account inside one write transaction.
    ///
    /// `change` returns `false` to leave the record untouched, in which case
    /// `None` is returned. Id, username and email are immutable once created;
    /// the reset ticket index follows `reset_password_token`.
    pub fn modify<F>(&self, account_id: &str, change: F) -> StorageResult<Option<Account>>
    where
        F: FnOnce(&mut Account) -> bool,
    {
        let write_txn = self.db.raw().begin_write()?;
        let updated = {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let existing: Account = read_record(&accounts, account_id)?
                .ok_or_else(|| StorageError::NotFound(format!("Account {account_id}")))?;

            let mut account = existing.clone();
            if !change(&mut account) {
                return Ok(None);
            }
            account.id = existing.id;
            account.username = existing.username;
            account.email = existing.email;

            if existing.reset_password_token != account.reset_password_token {
                let mut tickets = write_txn.open_table(RESET_TICKETS)?;
                if let Some(old) = existing.reset_password_token.as_deref() {
                    tickets.remove(old)?;
                }
                if let Some(new) = account.reset_password_token.as_deref() {
                    tickets.insert(new, account.id.as_str())?;
                }
            }

            account.updated_at = Utc::now();
            accounts.insert(account.id.as_str(), encode_record(&account)?.as_slice())?;
            account
        };
        write_txn.commit()?;
        Ok(Some(updated))
    }

    /// Replace the stored refresh token (or clear it with `None`).
    pub fn set_refresh_token(&self, account_id: &str, token: Option<&str>) -> StorageResult<()> {
        self.modify(account_id, |account| {
            account.refresh_token = token.map(str::to_string);
            true
        })?;
        Ok(())
    }

    /// Set or clear the admin flag.
    pub fn set_admin(&self, account_id: &str, is_admin: bool) -> StorageResult<()> {
        self.modify(account_id, |account| {
            account.is_admin = is_admin;
            true
        })?;
        Ok(())
    }

    /// Record that `follower_id` follows `followee_id`.
    ///
    /// Returns `false` when the relation already existed.
    pub fn follow(&self, follower_id: &str, followee_id: &str) -> StorageResult<bool> {
        self.update_relation(follower_id, followee_id, true)
    }

    /// Remove a follow relation. Returns `false` when it did not exist.
    pub fn unfollow(&self, follower_id: &str, followee_id: &str) -> StorageResult<bool> {
        self.update_relation(follower_id, followee_id, false)
    }

    fn update_relation(&self, follower_id: &str, followee_id: &str, follow: bool) -> StorageResult<bool> {
        let write_txn = self.db.raw().begin_write()?;
        let changed = {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let mut follower: Account = read_record(&accounts, follower_id)?
                .ok_or_else(|| StorageError::NotFound(format!("Account {follower_id}")))?;
            let mut followee: Account = read_record(&accounts, followee_id)?
                .ok_or_else(|| StorageError::NotFound(format!("Account {followee_id}")))?;

            let already = follower.following.iter().any(|id| id == followee_id);
            if already == follow {
                false
            } else {
                if follow {
                    follower.following.push(followee_id.to_string());
                    followee.followers.push(follower_id.to_string());
                } else {
                    follower.following.retain(|id| id != followee_id);
                    followee.followers.retain(|id| id != follower_id);
                }
                let now = Utc::now();
                follower.updated_at = now;
                followee.updated_at = now;
                accounts.insert(follower_id, encode_record(&follower)?.as_slice())?;
                accounts.insert(followee_id, encode_record(&followee)?.as_slice())?;
                true
            }
        };
        write_txn.commit()?;
        Ok(changed)
    }

    /// List all accounts, newest first.
    pub fn list_all(&self) -> StorageResult<Vec<Account>> {
        let read_txn = self.db.raw().begin_read()?;
        let table = read_txn.open_table(ACCOUNTS)?;
        let mut accounts: Vec<Account> = scan_records(&table)?;
        accounts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(accounts)
    }
}
