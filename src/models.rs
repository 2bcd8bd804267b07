// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request bodies and public views returned by the REST API. All wire types
//! use camelCase field names and derive `ToSchema` for the OpenAPI document.
//!
//! Stored records never leave the server directly when they carry secrets:
//! [`AccountView`] is the only outward form of an account, and it has no
//! password, refresh token or reset fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::storage::{
    Account, AdminAction, AdminLog, Comment, ConversationSummary, Message, Notification, Post,
    Story, TargetType,
};

// =============================================================================
// Accounts
// =============================================================================

/// Public view of an account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub name: String,
    pub bio: String,
    pub profile_image: String,
    pub website: String,
    pub location: String,
    pub follower_count: usize,
    pub following_count: usize,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            username: account.username.clone(),
            email: account.email.clone(),
            name: account.name.clone(),
            bio: account.bio.clone(),
            profile_image: account.profile_image.clone(),
            website: account.website.clone(),
            location: account.location.clone(),
            follower_count: account.followers.len(),
            following_count: account.following.len(),
            is_admin: account.is_admin,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Another account's profile, personalised when the viewer is known.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    #[serde(flatten)]
    pub account: AccountView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_following: Option<bool>,
}

/// Minimal identity of a conversation partner.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub username: String,
    pub name: String,
    pub profile_image: String,
}

impl From<&Account> for Participant {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            username: account.username.clone(),
            name: account.name.clone(),
            profile_image: account.profile_image.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    /// Plaintext reset ticket
    pub token: String,
    pub new_password: String,
}

/// Session opened by register or login.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: AccountView,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Forgot-password answer. `data.resetToken` is only present in `dev` builds.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResetTicketData>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetTicketData {
    pub reset_token: String,
}

// =============================================================================
// Posts
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub content: String,
    /// Image URLs from the upload provider
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CommentRequest {
    pub content: String,
}

/// Public view of a post.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub author: String,
    pub content: String,
    pub images: Vec<String>,
    pub like_count: usize,
    pub comment_count: u64,
    pub repost_count: usize,
    pub original_post: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liked_by_me: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostView {
    /// Build the view; `viewer` fills `likedByMe`.
    pub fn new(post: &Post, viewer: Option<&str>) -> Self {
        Self {
            id: post.id.clone(),
            author: post.author.clone(),
            content: post.content.clone(),
            images: post.images.clone(),
            like_count: post.likes.len(),
            comment_count: post.comment_count,
            repost_count: post.reposts.len(),
            original_post: post.original_post.clone(),
            liked_by_me: viewer.map(|id| post.is_liked_by(id)),
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub like_count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommentsResponse {
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserPostsResponse {
    pub posts: Vec<PostView>,
    pub pagination: Pagination,
}

// =============================================================================
// Follow Lists
// =============================================================================

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FollowersResponse {
    pub followers: Vec<Participant>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FollowingResponse {
    pub following: Vec<Participant>,
    pub pagination: Pagination,
}

// =============================================================================
// Stories
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateStoryRequest {
    /// Image URL from the upload provider
    #[serde(default)]
    pub image: String,
}

/// Public view of a story.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoryView {
    pub id: String,
    pub author: String,
    pub image: String,
    pub view_count: usize,
    pub is_viewed: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl StoryView {
    pub fn new(story: &Story, viewer: &str) -> Self {
        Self {
            id: story.id.clone(),
            author: story.author.clone(),
            image: story.image.clone(),
            view_count: story.viewers.len(),
            is_viewed: story.is_viewed_by(viewer),
            expires_at: story.expires_at,
            created_at: story.created_at,
        }
    }
}

/// An author's active stories, oldest first.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoryGroup {
    pub author: Participant,
    pub stories: Vec<StoryView>,
    pub all_viewed: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StoriesResponse {
    pub stories: Vec<StoryGroup>,
}

// =============================================================================
// Messages & Notifications
// =============================================================================

/// Pagination query (`page` starts at 1).
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

/// Upper bound for `limit`.
pub const MAX_PAGE_LIMIT: usize = 100;
/// Default page size for message history and the audit log.
pub const HISTORY_PAGE_LIMIT: usize = 50;
/// Default page size for follow lists and a user's posts.
pub const LIST_PAGE_LIMIT: usize = 20;

impl PageQuery {
    /// Page and limit clamped to usable values, with `default_limit` when
    /// no limit was sent.
    pub fn normalized(self, default_limit: usize) -> (usize, usize) {
        (
            self.page.unwrap_or(1).max(1),
            self.limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_LIMIT),
        )
    }
}

/// Position of a page within a list.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub pages: usize,
}

impl Pagination {
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        Self {
            page,
            limit,
            total,
            pages: total.div_ceil(limit.max(1)),
        }
    }

    /// Cut one page out of an already ordered list.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = self.page.saturating_sub(1).saturating_mul(self.limit).min(items.len());
        let end = start.saturating_add(self.limit).min(items.len());
        &items[start..end]
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    pub user: Option<Participant>,
    pub last_message: Message,
    pub unread_count: usize,
}

impl ConversationView {
    pub fn new(summary: ConversationSummary, peer: Option<&Account>) -> Self {
        Self {
            user: peer.map(Participant::from),
            last_message: summary.last_message,
            unread_count: summary.unread_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConversationsResponse {
    pub conversations: Vec<ConversationView>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
}

/// Number of records a bulk update touched.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UpdatedResponse {
    pub updated: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
}

// =============================================================================
// Admin
// =============================================================================

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_users: u64,
    pub total_posts: u64,
    pub total_comments: u64,
    pub total_messages: u64,
    pub total_notifications: u64,
    pub total_stories: u64,
    pub total_admin_logs: u64,
    /// Accounts with a live realtime connection
    pub connected_users: usize,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UsersResponse {
    pub users: Vec<AccountView>,
}

/// Optional body of an admin deletion.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ModerationRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Audit entry with the acting admin resolved.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminLogView {
    pub id: String,
    /// `None` once the admin account is gone
    pub admin: Option<Participant>,
    pub action: AdminAction,
    pub target_type: TargetType,
    pub target_id: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl AdminLogView {
    pub fn new(entry: AdminLog, admin: Option<&Account>) -> Self {
        Self {
            id: entry.id,
            admin: admin.map(Participant::from),
            action: entry.action,
            target_type: entry.target_type,
            target_id: entry.target_id,
            reason: entry.reason,
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdminLogsResponse {
    pub logs: Vec<AdminLogView>,
    pub pagination: Pagination,
}
