// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::Request,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::warn;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{require_access, require_admin},
    error::{ApiMessage, ErrorBody, ErrorCode, ErrorEnvelope, FieldError},
    models::{
        AccountView, AdminLogView, AdminLogsResponse, AuthResponse, CommentRequest,
        CommentsResponse, ConversationView, ConversationsResponse, CreatePostRequest,
        CreateStoryRequest, FollowersResponse, FollowingResponse, ForgotPasswordRequest,
        ForgotPasswordResponse, LikeResponse, LoginRequest, MessagesResponse, ModerationRequest,
        NotificationsResponse, Pagination, Participant, PostView, ProfileView, RefreshRequest,
        RefreshResponse, RegisterRequest, ResetPasswordRequest, ResetTicketData, StatsResponse,
        StoriesResponse, StoryGroup, StoryView, UpdateProfileRequest, UpdatedResponse,
        UserPostsResponse, UsersResponse,
    },
    realtime::ws_handler,
    state::AppState,
    storage::{AdminAction, Comment, Message, Notification, NotificationKind, TargetType},
};

pub mod admin;
pub mod auth;
pub mod health;
pub mod messages;
pub mod notifications;
pub mod posts;
pub mod stories;
pub mod users;
pub mod validation;

pub fn router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/stats", get(admin::get_stats))
        .route("/users", get(admin::list_users))
        .route("/users/{user_id}", delete(admin::delete_user))
        .route("/posts/{post_id}", delete(admin::delete_post))
        .route("/comments/{comment_id}", delete(admin::delete_comment))
        .route("/logs", get(admin::list_logs))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_access));

    let api_routes = Router::new()
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        // Users
        .route("/users/me", get(users::get_me))
        .route("/users/profile", put(users::update_profile))
        .route("/users/{user_id}", get(users::get_user))
        .route(
            "/users/{user_id}/follow",
            post(users::follow_user).delete(users::unfollow_user),
        )
        .route("/users/{user_id}/followers", get(users::list_followers))
        .route("/users/{user_id}/following", get(users::list_following))
        // Posts
        .route("/posts", post(posts::create_post))
        .route("/posts/user/{user_id}", get(posts::list_user_posts))
        .route(
            "/posts/{post_id}",
            get(posts::get_post).delete(posts::delete_post),
        )
        .route(
            "/posts/{post_id}/like",
            post(posts::like_post).delete(posts::unlike_post),
        )
        .route("/posts/{post_id}/comment", post(posts::comment_post))
        .route("/posts/{post_id}/comments", get(posts::list_comments))
        .route("/posts/{post_id}/repost", post(posts::repost_post))
        // Stories
        .route(
            "/stories",
            get(stories::list_stories).post(stories::create_story),
        )
        .route("/stories/{story_id}", delete(stories::delete_story))
        .route("/stories/{story_id}/view", post(stories::view_story))
        // Messages
        .route("/messages/conversations", get(messages::list_conversations))
        .route("/messages/{user_id}", get(messages::get_conversation))
        .route("/messages/{user_id}/seen", put(messages::mark_seen))
        // Notifications
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/read", put(notifications::mark_all_read))
        .nest("/admin", admin_routes);

    let cors = cors_layer(state.config.client_url.as_deref());

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/ws", get(ws_handler))
        .nest("/api", api_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

/// Single allowed origin when `CLIENT_URL` is set, permissive otherwise.
fn cors_layer(client_url: Option<&str>) -> CorsLayer {
    let Some(url) = client_url else {
        return CorsLayer::permissive();
    };
    match url.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
            .allow_credentials(true),
        Err(_) => {
            warn!(client_url = url, "CLIENT_URL is not a valid origin, CORS left permissive");
            CorsLayer::permissive()
        }
    }
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        auth::register,
        auth::login,
        auth::logout,
        auth::refresh,
        auth::forgot_password,
        auth::reset_password,
        users::get_me,
        users::get_user,
        users::update_profile,
        users::follow_user,
        users::unfollow_user,
        users::list_followers,
        users::list_following,
        posts::create_post,
        posts::list_user_posts,
        posts::get_post,
        posts::delete_post,
        posts::like_post,
        posts::unlike_post,
        posts::comment_post,
        posts::list_comments,
        posts::repost_post,
        stories::create_story,
        stories::list_stories,
        stories::view_story,
        stories::delete_story,
        messages::list_conversations,
        messages::get_conversation,
        messages::mark_seen,
        notifications::list_notifications,
        notifications::mark_all_read,
        admin::get_stats,
        admin::list_users,
        admin::delete_user,
        admin::delete_post,
        admin::delete_comment,
        admin::list_logs
    ),
    components(
        schemas(
            AccountView,
            ProfileView,
            Participant,
            UpdateProfileRequest,
            RegisterRequest,
            LoginRequest,
            RefreshRequest,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            AuthResponse,
            RefreshResponse,
            ForgotPasswordResponse,
            ResetTicketData,
            CreatePostRequest,
            CommentRequest,
            PostView,
            LikeResponse,
            CommentsResponse,
            UserPostsResponse,
            Pagination,
            FollowersResponse,
            FollowingResponse,
            CreateStoryRequest,
            StoryView,
            StoryGroup,
            StoriesResponse,
            ConversationView,
            ConversationsResponse,
            MessagesResponse,
            NotificationsResponse,
            UpdatedResponse,
            StatsResponse,
            UsersResponse,
            ModerationRequest,
            AdminLogView,
            AdminLogsResponse,
            AdminAction,
            TargetType,
            Comment,
            Message,
            Notification,
            NotificationKind,
            ApiMessage,
            ErrorEnvelope,
            ErrorBody,
            ErrorCode,
            FieldError,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and storage checks"),
        (name = "Auth", description = "Registration, sessions and password reset"),
        (name = "Users", description = "Profiles and follows"),
        (name = "Posts", description = "Posts, likes, comments and reposts"),
        (name = "Stories", description = "Images that expire after a day"),
        (name = "Messages", description = "Direct message history"),
        (name = "Notifications", description = "Activity notifications"),
        (name = "Admin", description = "Moderation and statistics")
    )
)]
pub struct ApiDoc;
