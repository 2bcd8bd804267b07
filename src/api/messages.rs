// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Direct message history. New messages are sent over the realtime socket.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    auth::Auth,
    error::{ok, ApiError, ApiResult, ApiSuccess},
    models::{
        ConversationView, ConversationsResponse, MessagesResponse, PageQuery, UpdatedResponse,
        HISTORY_PAGE_LIMIT,
    },
    state::AppState,
    storage::{AccountRepository, MessageRepository},
};

/// One entry per conversation partner, most recent first.
#[utoipa::path(
    get,
    path = "/api/messages/conversations",
    tag = "Messages",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Conversations", body = ConversationsResponse),
        (status = 401, description = "Missing or invalid access token"),
    )
)]
pub async fn list_conversations(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> ApiResult<Json<ApiSuccess<ConversationsResponse>>> {
    let accounts = AccountRepository::new(&state.db);
    let summaries = MessageRepository::new(&state.db).conversations(user.id())?;

    let mut conversations = Vec::with_capacity(summaries.len());
    for summary in summaries {
        let peer = accounts.find(&summary.peer_id)?;
        conversations.push(ConversationView::new(summary, peer.as_ref()));
    }
    Ok(ok(ConversationsResponse { conversations }))
}

/// Conversation with one account. Pages count back from the newest message;
/// each page is ordered oldest first.
#[utoipa::path(
    get,
    path = "/api/messages/{user_id}",
    params(
        ("user_id" = String, Path, description = "Conversation partner"),
        PageQuery
    ),
    tag = "Messages",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Messages", body = MessagesResponse),
        (status = 404, description = "No such account"),
    )
)]
pub async fn get_conversation(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(user_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<ApiSuccess<MessagesResponse>>> {
    if AccountRepository::new(&state.db).find(&user_id)?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    let (page, limit) = query.normalized(HISTORY_PAGE_LIMIT);
    let conversation =
        MessageRepository::new(&state.db).conversation(user.id(), &user_id, page, limit)?;

    Ok(ok(MessagesResponse {
        messages: conversation.messages,
        page,
        limit,
        total: conversation.total,
    }))
}

/// Mark everything `user_id` sent to the caller as seen. The sender gets a
/// `message_seen` event per message.
#[utoipa::path(
    put,
    path = "/api/messages/{user_id}/seen",
    params(("user_id" = String, Path, description = "Conversation partner")),
    tag = "Messages",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Number of messages marked seen", body = UpdatedResponse),
        (status = 401, description = "Missing or invalid access token"),
    )
)]
pub async fn mark_seen(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ApiSuccess<UpdatedResponse>>> {
    let updated = state.dispatcher.mark_conversation_seen(user.id(), &user_id)?;
    Ok(ok(UpdatedResponse { updated }))
}
