// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Story repository.
//!
//! A story is an image visible for [`STORY_LIFETIME_HOURS`] after it is
//! posted. Expired stories are hidden from reads straight away and removed
//! for good by [`StoryRepository::delete_expired`], which the background
//! sweeper calls.

use chrono::{DateTime, Duration, Utc};
use redb::ReadableDatabase;
use serde::{Deserialize, Serialize};

use super::super::{
    encode_record, read_record, scan_keyed, scan_records, Database, StorageError, StorageResult,
    STORIES,
};

pub const STORY_LIFETIME_HOURS: i64 = 24;

/// Story stored in the `stories` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Story {
    pub id: String,
    pub author: String,
    pub image: String,
    /// Accounts that opened the story, each at most once
    #[serde(default)]
    pub viewers: Vec<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Story {
    pub fn new(author: &str, image: &str) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            author: author.to_string(),
            image: image.trim().to_string(),
            viewers: Vec::new(),
            expires_at: now + Duration::hours(STORY_LIFETIME_HOURS),
            created_at: now,
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    pub fn is_viewed_by(&self, account_id: &str) -> bool {
        self.viewers.iter().any(|id| id == account_id)
    }
}

pub struct StoryRepository<'a> {
    db: &'a Database,
}

impl<'a> StoryRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn create(&self, story: &Story) -> StorageResult<()> {
        let json = encode_record(story)?;
        let write_txn = self.db.raw().begin_write()?;
        {
            let mut stories = write_txn.open_table(STORIES)?;
            if read_record::<Story, _>(&stories, &story.id)?.is_some() {
                return Err(StorageError::AlreadyExists("story"));
            }
            stories.insert(story.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a story that has not expired yet.
    pub fn find_active(&self, story_id: &str, now: DateTime<Utc>) -> StorageResult<Option<Story>> {
        let read_txn = self.db.raw().begin_read()?;
        let table = read_txn.open_table(STORIES)?;
        Ok(read_record::<Story, _>(&table, story_id)?.filter(|s| s.is_active(now)))
    }

    /// Unexpired stories by any of `authors`, oldest first.
    pub fn list_active_by(
        &self,
        authors: &[String],
        now: DateTime<Utc>,
    ) -> StorageResult<Vec<Story>> {
        let read_txn = self.db.raw().begin_read()?;
        let table = read_txn.open_table(STORIES)?;
        let mut stories: Vec<Story> = scan_records(&table)?;
        stories.retain(|s| s.is_active(now) && authors.contains(&s.author));
        stories.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(stories)
    }

    /// Record a view. Returns `false` when the account had already viewed it.
    pub fn mark_viewed(&self, story_id: &str, viewer: &str) -> StorageResult<bool> {
        let write_txn = self.db.raw().begin_write()?;
        {
            let mut stories = write_txn.open_table(STORIES)?;
            let mut story: Story = read_record(&stories, story_id)?
                .ok_or_else(|| StorageError::NotFound(format!("Story {story_id}")))?;
            if story.is_viewed_by(viewer) {
                return Ok(false);
            }
            story.viewers.push(viewer.to_string());
            stories.insert(story_id, encode_record(&story)?.as_slice())?;
        }
        write_txn.commit()?;
        Ok(true)
    }

    pub fn delete(&self, story_id: &str) -> StorageResult<Story> {
        let write_txn = self.db.raw().begin_write()?;
        let story = {
            let mut stories = write_txn.open_table(STORIES)?;
            let story: Story = read_record(&stories, story_id)?
                .ok_or_else(|| StorageError::NotFound(format!("Story {story_id}")))?;
            stories.remove(story_id)?;
            story
        };
        write_txn.commit()?;
        Ok(story)
    }

    /// Remove every story whose expiry is at or before `now`.
    pub fn delete_expired(&self, now: DateTime<Utc>) -> StorageResult<usize> {
        let write_txn = self.db.raw().begin_write()?;
        let removed = {
            let mut stories = write_txn.open_table(STORIES)?;
            let expired: Vec<String> = scan_keyed::<Story, _>(&stories)?
                .into_iter()
                .filter(|(_, s)| !s.is_active(now))
                .map(|(key, _)| key)
                .collect();
            for key in &expired {
                stories.remove(key.as_str())?;
            }
            expired.len()
        };
        write_txn.commit()?;
        Ok(removed)
    }
}
