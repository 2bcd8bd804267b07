// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP error and success envelopes.
//!
//! Failures render as `{success:false, error:{message, code, details?}}`,
//! successes as `{success:true, data}` or `{success:true, message}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{PasswordError, SessionError};
use crate::realtime::DispatchError;
use crate::storage::StorageError;

/// Machine-readable error code carried in every failure envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    BadRequest,
    Conflict,
    InvalidCredentials,
    NoToken,
    InvalidToken,
    UserNotFound,
    NoRefreshToken,
    InvalidRefreshToken,
    NotAuthenticated,
    Forbidden,
    InvalidOrExpiredToken,
    NotFound,
    InternalError,
}

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<Vec<FieldError>>,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub message: String,
    pub code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn validation(details: Vec<FieldError>) -> Self {
        Self {
            details: Some(details),
            ..Self::new(StatusCode::BAD_REQUEST, ErrorCode::ValidationError, "Validation failed")
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorCode::BadRequest, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, ErrorCode::Conflict, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorCode::NotFound, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, ErrorCode::Forbidden, message)
    }

    /// Unanticipated failure. The cause is logged; the response only carries
    /// it in `dev` builds.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        tracing::error!(error = %cause, "Internal error");
        let message = if cfg!(feature = "dev") {
            cause.to_string()
        } else {
            "Internal Server Error".to_string()
        };
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorEnvelope {
            success: false,
            error: ErrorBody {
                message: self.message,
                code: self.code,
                details: self.details,
            },
        });
        (self.status, body).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => Self::not_found(format!("{what} not found")),
            StorageError::AlreadyExists(field) => Self::conflict(format!("{field} already exists")),
            other => Self::internal(other),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Conflict("email") => Self::conflict("Email already registered"),
            SessionError::Conflict(_) => Self::conflict("Username already taken"),
            SessionError::InvalidCredentials => Self::new(
                StatusCode::UNAUTHORIZED,
                ErrorCode::InvalidCredentials,
                "Invalid credentials",
            ),
            SessionError::InvalidRefreshToken => Self::new(
                StatusCode::UNAUTHORIZED,
                ErrorCode::InvalidRefreshToken,
                "Invalid refresh token",
            ),
            SessionError::InvalidOrExpiredToken => Self::new(
                StatusCode::BAD_REQUEST,
                ErrorCode::InvalidOrExpiredToken,
                "Invalid or expired reset token",
            ),
            SessionError::Password(PasswordError::EmptyPassword) => Self::validation(vec![
                FieldError::new("password", "Password is required"),
            ]),
            SessionError::Storage(e) => e.into(),
            other => Self::internal(other),
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::InvalidMessage(reason) => {
                Self::validation(vec![FieldError::new("content", reason)])
            }
            DispatchError::RecipientNotFound => Self::not_found("User not found"),
            DispatchError::Storage(e) => e.into(),
        }
    }
}

// =============================================================================
// Success Envelopes
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ApiSuccess<T> {
    pub success: bool,
    pub data: T,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiMessage {
    pub success: bool,
    pub message: String,
}

/// `200 {success:true, data}`
pub fn ok<T: Serialize>(data: T) -> Json<ApiSuccess<T>> {
    Json(ApiSuccess {
        success: true,
        data,
    })
}

/// `201 {success:true, data}`
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiSuccess<T>>) {
    (StatusCode::CREATED, ok(data))
}

/// `200 {success:true, message}`
pub fn message(message: impl Into<String>) -> Json<ApiMessage> {
    Json(ApiMessage {
        success: true,
        message: message.into(),
    })
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn failure_envelope_shape() {
        let response = ApiError::conflict("Email already registered").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = body_of(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "CONFLICT");
        assert_eq!(body["error"]["message"], "Email already registered");
        assert!(body["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn validation_carries_details() {
        let response =
            ApiError::validation(vec![FieldError::new("email", "Invalid email")]).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_of(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"][0]["field"], "email");
    }

    #[cfg(not(feature = "dev"))]
    #[tokio::test]
    async fn internal_hides_cause() {
        let response = ApiError::internal("disk on fire").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_of(response).await;
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(body["error"]["message"], "Internal Server Error");
    }

    #[test]
    fn storage_errors_map_to_statuses() {
        let missing: ApiError = StorageError::NotFound("Post p1".to_string()).into();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        assert_eq!(missing.message, "Post p1 not found");

        let taken: ApiError = StorageError::AlreadyExists("username").into();
        assert_eq!(taken.status, StatusCode::CONFLICT);
    }

    #[test]
    fn session_errors_map_to_codes() {
        let cases = [
            (SessionError::Conflict("email"), StatusCode::CONFLICT, ErrorCode::Conflict),
            (SessionError::InvalidCredentials, StatusCode::UNAUTHORIZED, ErrorCode::InvalidCredentials),
            (SessionError::InvalidRefreshToken, StatusCode::UNAUTHORIZED, ErrorCode::InvalidRefreshToken),
            (SessionError::InvalidOrExpiredToken, StatusCode::BAD_REQUEST, ErrorCode::InvalidOrExpiredToken),
        ];
        for (err, status, code) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status, status);
            assert_eq!(api.code, code);
        }
    }

    #[tokio::test]
    async fn success_envelopes() {
        let body = serde_json::to_value(&ok(serde_json::json!({"n": 1})).0).unwrap();
        assert_eq!(body, serde_json::json!({"success": true, "data": {"n": 1}}));

        let body = serde_json::to_value(&message("done").0).unwrap();
        assert_eq!(body, serde_json::json!({"success": true, "message": "done"}));

        let (status, _) = created(1);
        assert_eq!(status, StatusCode::CREATED);
    }
}
