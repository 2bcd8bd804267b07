// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Post endpoints: create, read, delete, likes, comments and reposts.
//!
//! Likes, comments and reposts notify the post's author (never the actor
//! themselves) through the realtime dispatcher.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use super::notifications::fan_out;
use super::validation::ValidJson;
use crate::{
    auth::{Auth, OptionalAuth},
    error::{created, message, ok, ApiError, ApiMessage, ApiResult, ApiSuccess},
    models::{
        CommentRequest, CommentsResponse, CreatePostRequest, LikeResponse, PageQuery, Pagination,
        PostView, UserPostsResponse, LIST_PAGE_LIMIT,
    },
    state::AppState,
    storage::{
        AccountRepository, Comment, CommentRepository, Notification, NotificationKind, Post,
        PostRepository,
    },
};

#[utoipa::path(
    post,
    path = "/api/posts",
    request_body = CreatePostRequest,
    tag = "Posts",
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Post created", body = PostView),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Missing or invalid access token"),
    )
)]
pub async fn create_post(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidJson(request): ValidJson<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<ApiSuccess<PostView>>)> {
    let images = request
        .images
        .iter()
        .map(|url| url.trim().to_string())
        .collect();
    let post = Post::new(user.id(), request.content.trim(), images);
    PostRepository::new(&state.db).create(&post)?;

    info!(account_id = %user.id(), post_id = %post.id, "Post created");
    Ok(created(PostView::new(&post, Some(user.id()))))
}

#[utoipa::path(
    get,
    path = "/api/posts/{post_id}",
    params(("post_id" = String, Path, description = "Post identifier")),
    tag = "Posts",
    responses(
        (status = 200, description = "Post", body = PostView),
        (status = 404, description = "No such post"),
    )
)]
pub async fn get_post(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    Path(post_id): Path<String>,
) -> ApiResult<Json<ApiSuccess<PostView>>> {
    let post = PostRepository::new(&state.db).get(&post_id)?;
    let viewer_id = viewer.as_ref().map(|v| v.id());
    Ok(ok(PostView::new(&post, viewer_id)))
}

/// An account's posts and reposts, newest first.
#[utoipa::path(
    get,
    path = "/api/posts/user/{user_id}",
    params(("user_id" = String, Path, description = "Author account"), PageQuery),
    tag = "Posts",
    responses(
        (status = 200, description = "Posts by the account", body = UserPostsResponse),
        (status = 404, description = "No such account"),
    )
)]
pub async fn list_user_posts(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    Path(user_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<ApiSuccess<UserPostsResponse>>> {
    if AccountRepository::new(&state.db).find(&user_id)?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    let (page, limit) = query.normalized(LIST_PAGE_LIMIT);
    let listed = PostRepository::new(&state.db).list_by_author(&user_id, page, limit)?;

    let viewer_id = viewer.as_ref().map(|v| v.id());
    Ok(ok(UserPostsResponse {
        posts: listed.posts.iter().map(|p| PostView::new(p, viewer_id)).collect(),
        pagination: Pagination::new(page, limit, listed.total),
    }))
}

/// Delete one of your own posts with its comments.
#[utoipa::path(
    delete,
    path = "/api/posts/{post_id}",
    params(("post_id" = String, Path, description = "Post identifier")),
    tag = "Posts",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Post deleted", body = ApiMessage),
        (status = 403, description = "Not the author"),
        (status = 404, description = "No such post"),
    )
)]
pub async fn delete_post(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(post_id): Path<String>,
) -> ApiResult<Json<ApiMessage>> {
    let repo = PostRepository::new(&state.db);
    let post = repo.get(&post_id)?;
    if post.author != user.id() {
        return Err(ApiError::forbidden("You can only delete your own posts"));
    }
    repo.delete(&post_id)?;

    info!(account_id = %user.id(), post_id = %post_id, "Post deleted");
    Ok(message("Post deleted"))
}

#[utoipa::path(
    post,
    path = "/api/posts/{post_id}/like",
    params(("post_id" = String, Path, description = "Post identifier")),
    tag = "Posts",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Post liked", body = LikeResponse),
        (status = 404, description = "No such post"),
        (status = 409, description = "Already liked"),
    )
)]
pub async fn like_post(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(post_id): Path<String>,
) -> ApiResult<Json<ApiSuccess<LikeResponse>>> {
    let post = PostRepository::new(&state.db)
        .like(&post_id, user.id())?
        .ok_or_else(|| ApiError::conflict("Post already liked"))?;

    fan_out(
        &state,
        Notification::new(
            &post.author,
            user.id(),
            NotificationKind::Like,
            Some(post.id.clone()),
            None,
        ),
    );
    Ok(ok(LikeResponse {
        like_count: post.likes.len(),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/posts/{post_id}/like",
    params(("post_id" = String, Path, description = "Post identifier")),
    tag = "Posts",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Like removed", body = LikeResponse),
        (status = 400, description = "Post was not liked"),
        (status = 404, description = "No such post"),
    )
)]
pub async fn unlike_post(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(post_id): Path<String>,
) -> ApiResult<Json<ApiSuccess<LikeResponse>>> {
    let post = PostRepository::new(&state.db)
        .unlike(&post_id, user.id())?
        .ok_or_else(|| ApiError::bad_request("Post not liked"))?;
    Ok(ok(LikeResponse {
        like_count: post.likes.len(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/posts/{post_id}/comment",
    params(("post_id" = String, Path, description = "Post identifier")),
    request_body = CommentRequest,
    tag = "Posts",
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Comment added", body = Comment),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "No such post"),
    )
)]
pub async fn comment_post(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(post_id): Path<String>,
    ValidJson(request): ValidJson<CommentRequest>,
) -> ApiResult<(StatusCode, Json<ApiSuccess<Comment>>)> {
    let post = PostRepository::new(&state.db).get(&post_id)?;
    let comment = Comment::new(&post.id, user.id(), request.content.trim());
    CommentRepository::new(&state.db).create(&comment)?;

    fan_out(
        &state,
        Notification::new(
            &post.author,
            user.id(),
            NotificationKind::Comment,
            Some(post.id.clone()),
            Some(comment.id.clone()),
        ),
    );
    Ok(created(comment))
}

/// Comments of a post, oldest first.
#[utoipa::path(
    get,
    path = "/api/posts/{post_id}/comments",
    params(("post_id" = String, Path, description = "Post identifier")),
    tag = "Posts",
    responses(
        (status = 200, description = "Comments", body = CommentsResponse),
        (status = 404, description = "No such post"),
    )
)]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<Json<ApiSuccess<CommentsResponse>>> {
    PostRepository::new(&state.db).get(&post_id)?;
    let comments = CommentRepository::new(&state.db).list_for_post(&post_id)?;
    Ok(ok(CommentsResponse { comments }))
}

/// Repost a post; each account may repost a given post once.
#[utoipa::path(
    post,
    path = "/api/posts/{post_id}/repost",
    params(("post_id" = String, Path, description = "Post to repost")),
    tag = "Posts",
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Repost created", body = PostView),
        (status = 404, description = "No such post"),
        (status = 409, description = "Already reposted"),
    )
)]
pub async fn repost_post(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(post_id): Path<String>,
) -> ApiResult<(StatusCode, Json<ApiSuccess<PostView>>)> {
    let repo = PostRepository::new(&state.db);
    let original = repo.get(&post_id)?;
    let repost = repo
        .repost(&post_id, user.id())?
        .ok_or_else(|| ApiError::conflict("Post already reposted"))?;

    fan_out(
        &state,
        Notification::new(
            &original.author,
            user.id(),
            NotificationKind::Repost,
            Some(original.id.clone()),
            None,
        ),
    );
    Ok(created(PostView::new(&repost, Some(user.id()))))
}
