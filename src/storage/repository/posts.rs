// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Post and comment repositories.
//!
//! Likes and reposts are recorded on the post as lists of account ids, so
//! "once per account" is a membership check inside the write transaction.
//! A repost is itself a post whose `original_post` points at the source.

use chrono::{DateTime, Utc};
use redb::ReadableDatabase;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{
    encode_record, read_record, scan_keyed, scan_records, Database, RecordTable, StorageError,
    StorageResult, COMMENTS, NOTIFICATIONS, POSTS,
};
use super::notifications::Notification;

/// Post stored in the `posts` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    pub author: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default)]
    pub reposts: Vec<String>,
    #[serde(default)]
    pub original_post: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(author: &str, content: &str, images: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            author: author.to_string(),
            content: content.trim().to_string(),
            images,
            likes: Vec::new(),
            comment_count: 0,
            reposts: Vec::new(),
            original_post: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_liked_by(&self, account_id: &str) -> bool {
        self.likes.iter().any(|id| id == account_id)
    }
}

/// Comment stored in the `comments` table.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    /// Post this comment belongs to
    pub post: String,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(post: &str, author: &str, content: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            post: post.to_string(),
            author: author.to_string(),
            content: content.trim().to_string(),
            created_at: Utc::now(),
        }
    }
}

/// One page of an author's posts and their total count.
#[derive(Debug, Clone)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub total: usize,
}

/// Repository for post operations.
pub struct PostRepository<'a> {
    db: &'a Database,
}

impl<'a> PostRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn create(&self, post: &Post) -> StorageResult<()> {
        let json = encode_record(post)?;
        let write_txn = self.db.raw().begin_write()?;
        {
            let mut posts = write_txn.open_table(POSTS)?;
            if read_record::<Post, _>(&posts, &post.id)?.is_some() {
                return Err(StorageError::AlreadyExists("post"));
            }
            posts.insert(post.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get(&self, post_id: &str) -> StorageResult<Post> {
        self.find(post_id)?
            .ok_or_else(|| StorageError::NotFound(format!("Post {post_id}")))
    }

    pub fn find(&self, post_id: &str) -> StorageResult<Option<Post>> {
        let read_txn = self.db.raw().begin_read()?;
        let table = read_txn.open_table(POSTS)?;
        read_record(&table, post_id)
    }

    /// Add a like. Returns `None` when the account already liked the post.
    pub fn like(&self, post_id: &str, account_id: &str) -> StorageResult<Option<Post>> {
        self.modify(post_id, |post| {
            if post.is_liked_by(account_id) {
                return false;
            }
            post.likes.push(account_id.to_string());
            true
        })
    }

    /// Remove a like. Returns `None` when the post was not liked.
    pub fn unlike(&self, post_id: &str, account_id: &str) -> StorageResult<Option<Post>> {
        self.modify(post_id, |post| {
            if !post.is_liked_by(account_id) {
                return false;
            }
            post.likes.retain(|id| id != account_id);
            true
        })
    }

    /// Repost `original_id` as `account_id`.
    ///
    /// The repost copies the original's content and images. Returns `None`
    /// when the account already reposted it.
    pub fn repost(&self, original_id: &str, account_id: &str) -> StorageResult<Option<Post>> {
        let write_txn = self.db.raw().begin_write()?;
        let repost = {
            let mut posts = write_txn.open_table(POSTS)?;
            let mut original: Post = read_record(&posts, original_id)?
                .ok_or_else(|| StorageError::NotFound(format!("Post {original_id}")))?;
            if original.reposts.iter().any(|id| id == account_id) {
                return Ok(None);
            }

            let mut repost = Post::new(account_id, &original.content, original.images.clone());
            repost.original_post = Some(original_id.to_string());

            original.reposts.push(account_id.to_string());
            original.updated_at = Utc::now();
            posts.insert(original_id, encode_record(&original)?.as_slice())?;
            posts.insert(repost.id.as_str(), encode_record(&repost)?.as_slice())?;
            repost
        };
        write_txn.commit()?;
        Ok(Some(repost))
    }

    /// Posts by `author`, newest first. `page` starts at 1.
    pub fn list_by_author(&self, author: &str, page: usize, limit: usize) -> StorageResult<PostPage> {
        let read_txn = self.db.raw().begin_read()?;
        let table = read_txn.open_table(POSTS)?;
        let mut posts: Vec<Post> = scan_records(&table)?;
        posts.retain(|p| p.author == author);
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = posts.len();
        let skip = page.saturating_sub(1).saturating_mul(limit);
        let posts = posts.into_iter().skip(skip).take(limit).collect();
        Ok(PostPage { posts, total })
    }

    /// Delete a post together with its comments and the notifications that
    /// reference it.
    pub fn delete(&self, post_id: &str) -> StorageResult<Post> {
        let write_txn = self.db.raw().begin_write()?;
        let post = {
            let mut posts = write_txn.open_table(POSTS)?;
            let mut comments = write_txn.open_table(COMMENTS)?;
            let mut notifications = write_txn.open_table(NOTIFICATIONS)?;
            purge_post(&mut posts, &mut comments, &mut notifications, post_id)?
                .ok_or_else(|| StorageError::NotFound(format!("Post {post_id}")))?
        };
        write_txn.commit()?;
        Ok(post)
    }

    fn modify<F>(&self, post_id: &str, change: F) -> StorageResult<Option<Post>>
    where
        F: FnOnce(&mut Post) -> bool,
    {
        let write_txn = self.db.raw().begin_write()?;
        let updated = {
            let mut posts = write_txn.open_table(POSTS)?;
            let mut post: Post = read_record(&posts, post_id)?
                .ok_or_else(|| StorageError::NotFound(format!("Post {post_id}")))?;
            if !change(&mut post) {
                return Ok(None);
            }
            post.updated_at = Utc::now();
            posts.insert(post_id, encode_record(&post)?.as_slice())?;
            post
        };
        write_txn.commit()?;
        Ok(Some(updated))
    }
}

/// Remove a post, its comments and its notifications through already-open
/// tables. Deleting a repost also withdraws it from the original's list.
pub(super) fn purge_post(
    posts: &mut RecordTable<'_>,
    comments: &mut RecordTable<'_>,
    notifications: &mut RecordTable<'_>,
    post_id: &str,
) -> StorageResult<Option<Post>> {
    let Some(post) = read_record::<Post, _>(&*posts, post_id)? else {
        return Ok(None);
    };
    posts.remove(post_id)?;

    if let Some(original_id) = post.original_post.as_deref() {
        if let Some(mut original) = read_record::<Post, _>(&*posts, original_id)? {
            original.reposts.retain(|id| id != &post.author);
            posts.insert(original_id, encode_record(&original)?.as_slice())?;
        }
    }

    let comment_keys: Vec<String> = scan_keyed::<Comment, _>(&*comments)?
        .into_iter()
        .filter(|(_, c)| c.post == post_id)
        .map(|(key, _)| key)
        .collect();
    for key in &comment_keys {
        comments.remove(key.as_str())?;
    }

    let notification_keys: Vec<String> = scan_keyed::<Notification, _>(&*notifications)?
        .into_iter()
        .filter(|(_, n)| n.post.as_deref() == Some(post_id))
        .map(|(key, _)| key)
        .collect();
    for key in &notification_keys {
        notifications.remove(key.as_str())?;
    }

    Ok(Some(post))
}

/// Remove a comment and the notifications that point at it through
/// already-open tables, and take it off its post's count.
pub(super) fn purge_comment(
    posts: &mut RecordTable<'_>,
    comments: &mut RecordTable<'_>,
    notifications: &mut RecordTable<'_>,
    comment_id: &str,
) -> StorageResult<Option<Comment>> {
    let Some(comment) = read_record::<Comment, _>(&*comments, comment_id)? else {
        return Ok(None);
    };
    comments.remove(comment_id)?;

    if let Some(mut post) = read_record::<Post, _>(&*posts, &comment.post)? {
        post.comment_count = post.comment_count.saturating_sub(1);
        posts.insert(comment.post.as_str(), encode_record(&post)?.as_slice())?;
    }

    let notification_keys: Vec<String> = scan_keyed::<Notification, _>(&*notifications)?
        .into_iter()
        .filter(|(_, n)| n.comment.as_deref() == Some(comment_id))
        .map(|(key, _)| key)
        .collect();
    for key in &notification_keys {
        notifications.remove(key.as_str())?;
    }

    Ok(Some(comment))
}

/// Repository for comment operations.
pub struct CommentRepository<'a> {
    db: &'a Database,
}

impl<'a> CommentRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a comment and bump the post's comment count.
    pub fn create(&self, comment: &Comment) -> StorageResult<()> {
        let write_txn = self.db.raw().begin_write()?;
        {
            let mut posts = write_txn.open_table(POSTS)?;
            let mut post: Post = read_record(&posts, &comment.post)?
                .ok_or_else(|| StorageError::NotFound(format!("Post {}", comment.post)))?;
            post.comment_count += 1;
            posts.insert(comment.post.as_str(), encode_record(&post)?.as_slice())?;

            let mut comments = write_txn.open_table(COMMENTS)?;
            comments.insert(comment.id.as_str(), encode_record(comment)?.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn find(&self, comment_id: &str) -> StorageResult<Option<Comment>> {
        let read_txn = self.db.raw().begin_read()?;
        let table = read_txn.open_table(COMMENTS)?;
        read_record(&table, comment_id)
    }

    /// Comments of a post, oldest first.
    pub fn list_for_post(&self, post_id: &str) -> StorageResult<Vec<Comment>> {
        let read_txn = self.db.raw().begin_read()?;
        let table = read_txn.open_table(COMMENTS)?;
        let mut comments: Vec<Comment> = scan_records(&table)?;
        comments.retain(|c| c.post == post_id);
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }
}
