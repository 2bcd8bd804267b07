// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use tracing::warn;

use crate::{
    auth::Auth,
    error::{ok, ApiResult, ApiSuccess},
    models::{NotificationsResponse, UpdatedResponse},
    state::AppState,
    storage::{Notification, NotificationRepository},
};

/// Record a notification and push it to its recipient.
///
/// The action that caused it has already succeeded, so a failure here is
/// logged and not returned.
pub(super) fn fan_out(state: &AppState, notification: Notification) {
    let kind = notification.kind;
    if let Err(e) = state.dispatcher.notify(notification) {
        warn!(?kind, error = %e, "Failed to record notification");
    }
}

/// Own notifications, newest first.
#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "Notifications",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Notifications and unread count", body = NotificationsResponse),
        (status = 401, description = "Missing or invalid access token"),
    )
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> ApiResult<Json<ApiSuccess<NotificationsResponse>>> {
    let repo = NotificationRepository::new(&state.db);
    let notifications = repo.list_for(user.id())?;
    let unread_count = repo.unread_count(user.id())?;
    Ok(ok(NotificationsResponse {
        notifications,
        unread_count,
    }))
}

#[utoipa::path(
    put,
    path = "/api/notifications/read",
    tag = "Notifications",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Number of notifications marked read", body = UpdatedResponse),
        (status = 401, description = "Missing or invalid access token"),
    )
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> ApiResult<Json<ApiSuccess<UpdatedResponse>>> {
    let updated = NotificationRepository::new(&state.db).mark_all_read(user.id())?;
    Ok(ok(UpdatedResponse { updated }))
}
