// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only API endpoints.
//!
//! Routed behind `require_access` and `require_admin`, which run before any
//! handler here:
//! - System statistics
//! - Account overview
//! - Cascading deletion of accounts, posts and comments
//! - The moderation audit log
//!
//! Each deletion accepts an optional `{"reason": "..."}` body, stored with
//! the audit entry the cascade writes.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::info;

use super::validation::OptionalJson;
use crate::{
    auth::Auth,
    error::{message, ok, ApiError, ApiMessage, ApiResult, ApiSuccess},
    models::{
        AccountView, AdminLogView, AdminLogsResponse, ModerationRequest, PageQuery, Pagination,
        StatsResponse, UsersResponse, HISTORY_PAGE_LIMIT,
    },
    state::AppState,
    storage::{AccountRepository, AdminAction, AdminLog, AdminRepository, AuditRepository},
};

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "System statistics", body = StatsResponse),
        (status = 401, description = "Missing or invalid access token"),
        (status = 403, description = "Admin role required"),
    )
)]
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<ApiSuccess<StatsResponse>>> {
    let counts = AdminRepository::new(&state.db).counts()?;
    Ok(ok(StatsResponse {
        total_users: counts.accounts,
        total_posts: counts.posts,
        total_comments: counts.comments,
        total_messages: counts.messages,
        total_notifications: counts.notifications,
        total_stories: counts.stories,
        total_admin_logs: counts.admin_logs,
        connected_users: state.registry.connected_count(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    }))
}

/// Every account, newest first.
#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All accounts", body = UsersResponse),
        (status = 403, description = "Admin role required"),
    )
)]
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<ApiSuccess<UsersResponse>>> {
    let users = AccountRepository::new(&state.db)
        .list_all()?
        .iter()
        .map(AccountView::from)
        .collect();
    Ok(ok(UsersResponse { users }))
}

/// Delete an account and everything it owns or touched, in one transaction.
#[utoipa::path(
    delete,
    path = "/api/admin/users/{user_id}",
    params(("user_id" = String, Path, description = "Account to delete")),
    request_body(content = ModerationRequest, description = "Optional reason"),
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Account deleted", body = ApiMessage),
        (status = 400, description = "Cannot delete your own account"),
        (status = 403, description = "Admin role required, or target is an admin"),
        (status = 404, description = "No such account"),
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Auth(admin): Auth,
    Path(user_id): Path<String>,
    OptionalJson(request): OptionalJson<ModerationRequest>,
) -> ApiResult<Json<ApiMessage>> {
    if user_id == admin.id() {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }
    let target = AccountRepository::new(&state.db)
        .find(&user_id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    if target.is_admin {
        return Err(ApiError::forbidden("Cannot delete admin users"));
    }

    let entry = AdminLog::new(
        admin.id(),
        AdminAction::DeleteUser,
        &user_id,
        request.reason.as_deref(),
    );
    let purge = AdminRepository::new(&state.db).delete_account(&user_id, &entry)?;

    info!(
        admin_id = %admin.id(),
        account_id = %user_id,
        posts = purge.posts,
        comments = purge.comments,
        messages = purge.messages,
        notifications = purge.notifications,
        stories = purge.stories,
        "Account deleted by admin"
    );
    Ok(message("User and associated data deleted"))
}

#[utoipa::path(
    delete,
    path = "/api/admin/posts/{post_id}",
    params(("post_id" = String, Path, description = "Post to delete")),
    request_body(content = ModerationRequest, description = "Optional reason"),
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Post deleted", body = ApiMessage),
        (status = 400, description = "Reason too long"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "No such post"),
    )
)]
pub async fn delete_post(
    State(state): State<AppState>,
    Auth(admin): Auth,
    Path(post_id): Path<String>,
    OptionalJson(request): OptionalJson<ModerationRequest>,
) -> ApiResult<Json<ApiMessage>> {
    let entry = AdminLog::new(
        admin.id(),
        AdminAction::DeletePost,
        &post_id,
        request.reason.as_deref(),
    );
    let post = AdminRepository::new(&state.db).delete_post(&post_id, &entry)?;
    info!(
        admin_id = %admin.id(),
        post_id = %post_id,
        author_id = %post.author,
        "Post deleted by admin"
    );
    Ok(message("Post deleted"))
}

/// Delete a comment and the notification it raised.
#[utoipa::path(
    delete,
    path = "/api/admin/comments/{comment_id}",
    params(("comment_id" = String, Path, description = "Comment to delete")),
    request_body(content = ModerationRequest, description = "Optional reason"),
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Comment deleted", body = ApiMessage),
        (status = 400, description = "Reason too long"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "No such comment"),
    )
)]
pub async fn delete_comment(
    State(state): State<AppState>,
    Auth(admin): Auth,
    Path(comment_id): Path<String>,
    OptionalJson(request): OptionalJson<ModerationRequest>,
) -> ApiResult<Json<ApiMessage>> {
    let entry = AdminLog::new(
        admin.id(),
        AdminAction::DeleteComment,
        &comment_id,
        request.reason.as_deref(),
    );
    let comment = AdminRepository::new(&state.db).delete_comment(&comment_id, &entry)?;
    info!(
        admin_id = %admin.id(),
        comment_id = %comment_id,
        post_id = %comment.post,
        "Comment deleted by admin"
    );
    Ok(message("Comment deleted successfully"))
}

/// Moderation audit log, newest first.
#[utoipa::path(
    get,
    path = "/api/admin/logs",
    params(PageQuery),
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Audit entries", body = AdminLogsResponse),
        (status = 403, description = "Admin role required"),
    )
)]
pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<ApiSuccess<AdminLogsResponse>>> {
    let (page, limit) = query.normalized(HISTORY_PAGE_LIMIT);
    let logged = AuditRepository::new(&state.db).list(page, limit)?;

    let accounts = AccountRepository::new(&state.db);
    let mut logs = Vec::with_capacity(logged.entries.len());
    for entry in logged.entries {
        let admin = accounts.find(&entry.admin)?;
        logs.push(AdminLogView::new(entry, admin.as_ref()));
    }
    Ok(ok(AdminLogsResponse {
        logs,
        pagination: Pagination::new(page, limit, logged.total),
    }))
}
