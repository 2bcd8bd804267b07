// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication gate errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::error::{ApiError, ErrorCode};

/// Rejections produced by the request authenticator.
///
/// `NoToken`, `InvalidToken` and `UserNotFound` are all 401s; clients should
/// treat them the same way (re-authenticate).
#[derive(Debug)]
pub enum AuthError {
    /// Missing or non-Bearer Authorization header
    NoToken,
    /// Access token failed verification
    InvalidToken,
    /// Token subject no longer exists
    UserNotFound,
    /// Refresh request without a refresh token in the body
    NoRefreshToken,
    /// Refresh token failed verification or is not the stored one
    InvalidRefreshToken,
    /// Admin gate reached without prior authentication
    NotAuthenticated,
    /// Authenticated but not an admin
    Forbidden,
    /// Store failure while loading the account
    Internal(String),
}

impl AuthError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            AuthError::NoToken => ErrorCode::NoToken,
            AuthError::InvalidToken => ErrorCode::InvalidToken,
            AuthError::UserNotFound => ErrorCode::UserNotFound,
            AuthError::NoRefreshToken => ErrorCode::NoRefreshToken,
            AuthError::InvalidRefreshToken => ErrorCode::InvalidRefreshToken,
            AuthError::NotAuthenticated => ErrorCode::NotAuthenticated,
            AuthError::Forbidden => ErrorCode::Forbidden,
            AuthError::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::NoToken => write!(f, "Access token is required"),
            AuthError::InvalidToken => write!(f, "Invalid or expired access token"),
            AuthError::UserNotFound => write!(f, "User not found"),
            AuthError::NoRefreshToken => write!(f, "Refresh token is required"),
            AuthError::InvalidRefreshToken => write!(f, "Invalid or expired refresh token"),
            AuthError::NotAuthenticated => write!(f, "Authentication required"),
            AuthError::Forbidden => write!(f, "Admin privileges required"),
            AuthError::Internal(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Internal(cause) => ApiError::internal(cause),
            other => ApiError::new(other.status_code(), other.error_code(), other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
