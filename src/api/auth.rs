// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session endpoints: register, login, logout, refresh and password reset.

use axum::{extract::State, http::StatusCode, Json};

use super::validation::ValidJson;
use crate::{
    auth::{session::Registration, Auth, RefreshAuth},
    error::{created, message, ok, ApiMessage, ApiResult, ApiSuccess},
    models::{
        AccountView, AuthResponse, ForgotPasswordRequest, ForgotPasswordResponse, LoginRequest,
        RefreshRequest, RefreshResponse, RegisterRequest, ResetPasswordRequest, ResetTicketData,
    },
    state::AppState,
};

/// Same answer whether or not the email is registered.
pub const FORGOT_PASSWORD_MESSAGE: &str = "If the email exists, a reset link has been sent";

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    tag = "Auth",
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email or username already in use"),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<ApiSuccess<AuthResponse>>)> {
    let grant = state.sessions.register(Registration {
        username: request.username.trim(),
        email: request.email.trim(),
        password: &request.password,
        name: request.name.trim(),
    })
    .await?;

    Ok(created(AuthResponse {
        user: AccountView::from(&grant.account),
        access_token: grant.tokens.access_token,
        refresh_token: grant.tokens.refresh_token,
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Session opened", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<LoginRequest>,
) -> ApiResult<Json<ApiSuccess<AuthResponse>>> {
    let grant = state
        .sessions
        .login(request.email.trim(), &request.password)
        .await?;

    Ok(ok(AuthResponse {
        user: AccountView::from(&grant.account),
        access_token: grant.tokens.access_token,
        refresh_token: grant.tokens.refresh_token,
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Refresh token cleared", body = ApiMessage),
        (status = 401, description = "Missing or invalid access token"),
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> ApiResult<Json<ApiMessage>> {
    state.sessions.logout(user.id())?;
    Ok(message("Logged out successfully"))
}

/// Exchange the stored refresh token for a new access token.
///
/// The refresh token itself is not rotated.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "New access token", body = RefreshResponse),
        (status = 401, description = "Missing, invalid or superseded refresh token"),
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    RefreshAuth { account, token }: RefreshAuth,
) -> ApiResult<Json<ApiSuccess<RefreshResponse>>> {
    let access_token = state.sessions.refresh(&account, &token)?;
    Ok(ok(RefreshResponse { access_token }))
}

/// Start a password reset.
///
/// The ticket is only echoed back in `dev` builds; otherwise it has to be
/// delivered out of band.
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Generic acknowledgement", body = ForgotPasswordResponse),
    )
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<ForgotPasswordRequest>,
) -> ApiResult<Json<ForgotPasswordResponse>> {
    let ticket = state.sessions.forgot_password(request.email.trim())?;

    let data = if cfg!(feature = "dev") {
        ticket.map(|reset_token| ResetTicketData { reset_token })
    } else {
        None
    };

    Ok(Json(ForgotPasswordResponse {
        success: true,
        message: FORGOT_PASSWORD_MESSAGE.to_string(),
        data,
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Password changed", body = ApiMessage),
        (status = 400, description = "Invalid or expired reset token"),
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<ResetPasswordRequest>,
) -> ApiResult<Json<ApiMessage>> {
    state
        .sessions
        .reset_password(request.token.trim(), &request.new_password)
        .await?;
    Ok(message("Password reset successfully"))
}
