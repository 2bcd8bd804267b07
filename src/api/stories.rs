// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Story endpoints.
//!
//! Stories expire a day after posting. The feed shows the viewer's own
//! stories and those of accounts they follow, grouped by author.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::info;

use super::validation::ValidJson;
use crate::{
    auth::Auth,
    error::{created, message, ok, ApiError, ApiMessage, ApiResult, ApiSuccess},
    models::{CreateStoryRequest, Participant, StoriesResponse, StoryGroup, StoryView},
    state::AppState,
    storage::{AccountRepository, Story, StoryRepository},
};

#[utoipa::path(
    post,
    path = "/api/stories",
    request_body = CreateStoryRequest,
    tag = "Stories",
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Story posted", body = StoryView),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Missing or invalid access token"),
    )
)]
pub async fn create_story(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidJson(request): ValidJson<CreateStoryRequest>,
) -> ApiResult<(StatusCode, Json<ApiSuccess<StoryView>>)> {
    let story = Story::new(user.id(), &request.image);
    StoryRepository::new(&state.db).create(&story)?;
    info!(account_id = %user.id(), story_id = %story.id, "Story posted");
    Ok(created(StoryView::new(&story, user.id())))
}

/// Active stories from followed accounts and the viewer.
#[utoipa::path(
    get,
    path = "/api/stories",
    tag = "Stories",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Stories grouped by author", body = StoriesResponse),
        (status = 401, description = "Missing or invalid access token"),
    )
)]
pub async fn list_stories(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> ApiResult<Json<ApiSuccess<StoriesResponse>>> {
    let accounts = AccountRepository::new(&state.db);
    let viewer = accounts
        .find(user.id())?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let mut authors = viewer.following.clone();
    authors.push(viewer.id.clone());
    let stories = StoryRepository::new(&state.db).list_active_by(&authors, Utc::now())?;

    let mut groups: Vec<StoryGroup> = Vec::new();
    for story in &stories {
        let view = StoryView::new(story, &viewer.id);
        if let Some(group) = groups.iter_mut().find(|g| g.author.id == story.author) {
            group.all_viewed &= view.is_viewed;
            group.stories.push(view);
            continue;
        }
        let Some(author) = accounts.find(&story.author)? else {
            continue;
        };
        groups.push(StoryGroup {
            author: Participant::from(&author),
            all_viewed: view.is_viewed,
            stories: vec![view],
        });
    }
    Ok(ok(StoriesResponse { stories: groups }))
}

#[utoipa::path(
    post,
    path = "/api/stories/{story_id}/view",
    params(("story_id" = String, Path, description = "Story identifier")),
    tag = "Stories",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Story marked as viewed", body = ApiMessage),
        (status = 404, description = "No such story, or it expired"),
    )
)]
pub async fn view_story(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(story_id): Path<String>,
) -> ApiResult<Json<ApiMessage>> {
    let repo = StoryRepository::new(&state.db);
    if repo.find_active(&story_id, Utc::now())?.is_none() {
        return Err(ApiError::not_found("Story not found"));
    }
    repo.mark_viewed(&story_id, user.id())?;
    Ok(message("Story marked as viewed"))
}

/// Delete one of your own stories.
#[utoipa::path(
    delete,
    path = "/api/stories/{story_id}",
    params(("story_id" = String, Path, description = "Story identifier")),
    tag = "Stories",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Story deleted", body = ApiMessage),
        (status = 403, description = "Not the author"),
        (status = 404, description = "No such story"),
    )
)]
pub async fn delete_story(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(story_id): Path<String>,
) -> ApiResult<Json<ApiMessage>> {
    let repo = StoryRepository::new(&state.db);
    let story = repo
        .find_active(&story_id, Utc::now())?
        .ok_or_else(|| ApiError::not_found("Story not found"))?;
    if story.author != user.id() {
        return Err(ApiError::forbidden("Not authorized to delete this story"));
    }
    repo.delete(&story_id)?;
    info!(account_id = %user.id(), story_id = %story_id, "Story deleted");
    Ok(message("Story deleted successfully"))
}
