// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Profile and follow endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::notifications::fan_out;
use super::validation::ValidJson;
use crate::{
    auth::{Auth, OptionalAuth},
    error::{message, ok, ApiError, ApiMessage, ApiResult, ApiSuccess},
    models::{
        AccountView, FollowersResponse, FollowingResponse, PageQuery, Pagination, Participant,
        ProfileView, UpdateProfileRequest, LIST_PAGE_LIMIT,
    },
    state::AppState,
    storage::{AccountRepository, Notification, NotificationKind, StorageResult},
};

/// The authenticated account.
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current account", body = AccountView),
        (status = 401, description = "Missing or invalid access token"),
    )
)]
pub async fn get_me(Auth(user): Auth) -> Json<ApiSuccess<AccountView>> {
    ok(user.account)
}

/// Public profile. `isFollowing` is included for an authenticated viewer.
#[utoipa::path(
    get,
    path = "/api/users/{user_id}",
    params(("user_id" = String, Path, description = "Account identifier")),
    tag = "Users",
    responses(
        (status = 200, description = "Profile", body = ProfileView),
        (status = 404, description = "No such account"),
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ApiSuccess<ProfileView>>> {
    let account = AccountRepository::new(&state.db)
        .find(&user_id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let is_following = viewer.map(|v| account.followers.iter().any(|id| id == v.id()));
    Ok(ok(ProfileView {
        account: AccountView::from(&account),
        is_following,
    }))
}

#[utoipa::path(
    put,
    path = "/api/users/profile",
    request_body = UpdateProfileRequest,
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated account", body = AccountView),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Missing or invalid access token"),
    )
)]
pub async fn update_profile(
    State(state): State<AppState>,
    Auth(user): Auth,
    ValidJson(request): ValidJson<UpdateProfileRequest>,
) -> ApiResult<Json<ApiSuccess<AccountView>>> {
    let updated = AccountRepository::new(&state.db)
        .modify(user.id(), |account| {
            if let Some(name) = request.name {
                account.name = name.trim().to_string();
            }
            if let Some(bio) = request.bio {
                account.bio = bio.trim().to_string();
            }
            if let Some(website) = request.website {
                account.website = website.trim().to_string();
            }
            if let Some(location) = request.location {
                account.location = location.trim().to_string();
            }
            true
        })?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(ok(AccountView::from(&updated)))
}

#[utoipa::path(
    post,
    path = "/api/users/{user_id}/follow",
    params(("user_id" = String, Path, description = "Account to follow")),
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Now following", body = ApiMessage),
        (status = 400, description = "Cannot follow yourself"),
        (status = 404, description = "No such account"),
        (status = 409, description = "Already following"),
    )
)]
pub async fn follow_user(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ApiMessage>> {
    if user_id == user.id() {
        return Err(ApiError::bad_request("You cannot follow yourself"));
    }
    let repo = AccountRepository::new(&state.db);
    if repo.find(&user_id)?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    if !repo.follow(user.id(), &user_id)? {
        return Err(ApiError::conflict("Already following this user"));
    }

    fan_out(
        &state,
        Notification::new(&user_id, user.id(), NotificationKind::Follow, None, None),
    );
    Ok(message("User followed"))
}

#[utoipa::path(
    delete,
    path = "/api/users/{user_id}/follow",
    params(("user_id" = String, Path, description = "Account to unfollow")),
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "No longer following", body = ApiMessage),
        (status = 400, description = "Not following"),
        (status = 404, description = "No such account"),
    )
)]
pub async fn unfollow_user(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ApiMessage>> {
    let repo = AccountRepository::new(&state.db);
    if repo.find(&user_id)?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    if !repo.unfollow(user.id(), &user_id)? {
        return Err(ApiError::bad_request("You are not following this user"));
    }
    Ok(message("User unfollowed"))
}

/// Resolve one page of an account id list, in stored order.
fn page_of_accounts(
    repo: &AccountRepository<'_>,
    ids: &[String],
    query: PageQuery,
) -> StorageResult<(Vec<Participant>, Pagination)> {
    let (page, limit) = query.normalized(LIST_PAGE_LIMIT);
    let pagination = Pagination::new(page, limit, ids.len());
    let mut accounts = Vec::new();
    for id in pagination.slice(ids) {
        if let Some(account) = repo.find(id)? {
            accounts.push(Participant::from(&account));
        }
    }
    Ok((accounts, pagination))
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}/followers",
    params(("user_id" = String, Path, description = "Account identifier"), PageQuery),
    tag = "Users",
    responses(
        (status = 200, description = "Accounts following this one", body = FollowersResponse),
        (status = 404, description = "No such account"),
    )
)]
pub async fn list_followers(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<ApiSuccess<FollowersResponse>>> {
    let repo = AccountRepository::new(&state.db);
    let account = repo
        .find(&user_id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    let (followers, pagination) = page_of_accounts(&repo, &account.followers, query)?;
    Ok(ok(FollowersResponse {
        followers,
        pagination,
    }))
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}/following",
    params(("user_id" = String, Path, description = "Account identifier"), PageQuery),
    tag = "Users",
    responses(
        (status = 200, description = "Accounts this one follows", body = FollowingResponse),
        (status = 404, description = "No such account"),
    )
)]
pub async fn list_following(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<ApiSuccess<FollowingResponse>>> {
    let repo = AccountRepository::new(&state.db);
    let account = repo
        .find(&user_id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    let (following, pagination) = page_of_accounts(&repo, &account.following, query)?;
    Ok(ok(FollowingResponse {
        following,
        pagination,
    }))
}
