// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Administrative queries and cascading deletes.
//!
//! Each cascade runs in a single redb write transaction: either every
//! dependent record is removed together with its parent and the
//! [`AdminLog`] entry describing it is written, or nothing is.

use redb::{ReadableDatabase, ReadableTableMetadata};

use super::super::{
    encode_record, read_record, scan_keyed, Database, StorageError, StorageResult, ACCOUNTS,
    ACCOUNT_EMAILS, ACCOUNT_USERNAMES, ADMIN_LOGS, COMMENTS, MESSAGES, NOTIFICATIONS, POSTS,
    RESET_TICKETS, STORIES,
};
use super::accounts::Account;
use super::audit::{append, AdminLog};
use super::messages::Message;
use super::notifications::Notification;
use super::posts::{purge_comment, purge_post, Comment, Post};
use super::stories::Story;

/// Row counts per entity table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCounts {
    pub accounts: u64,
    pub posts: u64,
    pub comments: u64,
    pub messages: u64,
    pub notifications: u64,
    pub stories: u64,
    pub admin_logs: u64,
}

/// What an account cascade removed besides the account itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountPurge {
    pub posts: usize,
    pub comments: usize,
    pub messages: usize,
    pub notifications: usize,
    pub stories: usize,
}

pub struct AdminRepository<'a> {
    db: &'a Database,
}

impl<'a> AdminRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn counts(&self) -> StorageResult<EntityCounts> {
        let read_txn = self.db.raw().begin_read()?;
        Ok(EntityCounts {
            accounts: read_txn.open_table(ACCOUNTS)?.len()?,
            posts: read_txn.open_table(POSTS)?.len()?,
            comments: read_txn.open_table(COMMENTS)?.len()?,
            messages: read_txn.open_table(MESSAGES)?.len()?,
            notifications: read_txn.open_table(NOTIFICATIONS)?.len()?,
            stories: read_txn.open_table(STORIES)?.len()?,
            admin_logs: read_txn.open_table(ADMIN_LOGS)?.len()?,
        })
    }

    /// Delete an account and everything that belongs to or points at it.
    ///
    /// Removes the account with its index entries, its posts (with their
    /// comments and notifications), its comments elsewhere, its likes and
    /// reposts, every message it sent or received, every notification it
    /// received or caused, its stories, and its follow edges on other
    /// accounts. `entry` is appended to the audit log in the same commit.
    pub fn delete_account(&self, account_id: &str, entry: &AdminLog) -> StorageResult<AccountPurge> {
        let write_txn = self.db.raw().begin_write()?;
        let purge = {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let account: Account = read_record(&accounts, account_id)?
                .ok_or_else(|| StorageError::NotFound(format!("Account {account_id}")))?;

            let mut usernames = write_txn.open_table(ACCOUNT_USERNAMES)?;
            usernames.remove(account.username.as_str())?;
            let mut emails = write_txn.open_table(ACCOUNT_EMAILS)?;
            emails.remove(account.email.as_str())?;
            if let Some(ticket) = account.reset_password_token.as_deref() {
                let mut tickets = write_txn.open_table(RESET_TICKETS)?;
                tickets.remove(ticket)?;
            }
            accounts.remove(account_id)?;

            for (key, mut other) in scan_keyed::<Account, _>(&accounts)? {
                let before = (other.followers.len(), other.following.len());
                other.followers.retain(|id| id != account_id);
                other.following.retain(|id| id != account_id);
                if before != (other.followers.len(), other.following.len()) {
                    accounts.insert(key.as_str(), encode_record(&other)?.as_slice())?;
                }
            }

            let mut posts = write_txn.open_table(POSTS)?;
            let mut comments = write_txn.open_table(COMMENTS)?;
            let mut notifications = write_txn.open_table(NOTIFICATIONS)?;
            let mut purge = AccountPurge::default();

            let authored: Vec<String> = scan_keyed::<Post, _>(&posts)?
                .into_iter()
                .filter(|(_, p)| p.author == account_id)
                .map(|(key, _)| key)
                .collect();
            for post_id in &authored {
                if purge_post(&mut posts, &mut comments, &mut notifications, post_id)?.is_some() {
                    purge.posts += 1;
                }
            }

            let own_comments: Vec<String> = scan_keyed::<Comment, _>(&comments)?
                .into_iter()
                .filter(|(_, c)| c.author == account_id)
                .map(|(key, _)| key)
                .collect();
            for key in &own_comments {
                if purge_comment(&mut posts, &mut comments, &mut notifications, key)?.is_some() {
                    purge.comments += 1;
                }
            }

            for (key, mut post) in scan_keyed::<Post, _>(&posts)? {
                let before = (post.likes.len(), post.reposts.len());
                post.likes.retain(|id| id != account_id);
                post.reposts.retain(|id| id != account_id);
                if before != (post.likes.len(), post.reposts.len()) {
                    posts.insert(key.as_str(), encode_record(&post)?.as_slice())?;
                }
            }

            let mut messages = write_txn.open_table(MESSAGES)?;
            let message_keys: Vec<String> = scan_keyed::<Message, _>(&messages)?
                .into_iter()
                .filter(|(_, m)| m.sender == account_id || m.recipient == account_id)
                .map(|(key, _)| key)
                .collect();
            for key in &message_keys {
                messages.remove(key.as_str())?;
            }
            purge.messages = message_keys.len();

            let notification_keys: Vec<String> = scan_keyed::<Notification, _>(&notifications)?
                .into_iter()
                .filter(|(_, n)| n.recipient == account_id || n.actor == account_id)
                .map(|(key, _)| key)
                .collect();
            for key in &notification_keys {
                notifications.remove(key.as_str())?;
            }
            purge.notifications = notification_keys.len();

            let mut stories = write_txn.open_table(STORIES)?;
            let story_keys: Vec<String> = scan_keyed::<Story, _>(&stories)?
                .into_iter()
                .filter(|(_, s)| s.author == account_id)
                .map(|(key, _)| key)
                .collect();
            for key in &story_keys {
                stories.remove(key.as_str())?;
            }
            for (key, mut story) in scan_keyed::<Story, _>(&stories)? {
                let before = story.viewers.len();
                story.viewers.retain(|id| id != account_id);
                if story.viewers.len() != before {
                    stories.insert(key.as_str(), encode_record(&story)?.as_slice())?;
                }
            }
            purge.stories = story_keys.len();

            let mut logs = write_txn.open_table(ADMIN_LOGS)?;
            append(&mut logs, entry)?;
            purge
        };
        write_txn.commit()?;
        Ok(purge)
    }

    /// Delete a post with its comments and notifications, logging `entry`.
    pub fn delete_post(&self, post_id: &str, entry: &AdminLog) -> StorageResult<Post> {
        let write_txn = self.db.raw().begin_write()?;
        let post = {
            let mut posts = write_txn.open_table(POSTS)?;
            let mut comments = write_txn.open_table(COMMENTS)?;
            let mut notifications = write_txn.open_table(NOTIFICATIONS)?;
            let post = purge_post(&mut posts, &mut comments, &mut notifications, post_id)?
                .ok_or_else(|| StorageError::NotFound(format!("Post {post_id}")))?;
            let mut logs = write_txn.open_table(ADMIN_LOGS)?;
            append(&mut logs, entry)?;
            post
        };
        write_txn.commit()?;
        Ok(post)
    }

    /// Delete a comment, decrement its post's count and drop the
    /// notifications that point at it, logging `entry`.
    pub fn delete_comment(&self, comment_id: &str, entry: &AdminLog) -> StorageResult<Comment> {
        let write_txn = self.db.raw().begin_write()?;
        let comment = {
            let mut posts = write_txn.open_table(POSTS)?;
            let mut comments = write_txn.open_table(COMMENTS)?;
            let mut notifications = write_txn.open_table(NOTIFICATIONS)?;
            let comment = purge_comment(&mut posts, &mut comments, &mut notifications, comment_id)?
                .ok_or_else(|| StorageError::NotFound(format!("Comment {comment_id}")))?;
            let mut logs = write_txn.open_table(ADMIN_LOGS)?;
            append(&mut logs, entry)?;
            comment
        };
        write_txn.commit()?;
        Ok(comment)
    }
}
