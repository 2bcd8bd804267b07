// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated accounts.
//!
//! Use the `Auth` extractor in handlers to require an access token:
//!
//! ```rust,ignore
//! async fn me(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedAccount
//! }
//! ```
//!
//! `OptionalAuth` never rejects, and `RefreshAuth` reads the refresh token
//! from the JSON body instead of the Authorization header.

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use serde::Deserialize;

use super::{AuthError, AuthenticatedAccount};
use crate::state::AppState;
use crate::storage::{Account, AccountRepository};

/// Bearer token from the Authorization header, if well-formed.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Verify an access token and load the account it names.
pub fn authenticate_access(state: &AppState, token: &str) -> Result<AuthenticatedAccount, AuthError> {
    let claims = state
        .tokens
        .verify_access(token)
        .map_err(|_| AuthError::InvalidToken)?;

    let account = AccountRepository::new(&state.db)
        .find(&claims.sub)
        .map_err(|e| AuthError::Internal(e.to_string()))?
        .ok_or(AuthError::UserNotFound)?;

    Ok(AuthenticatedAccount::new(&account, &claims))
}

/// Extractor for authenticated accounts.
///
/// Reuses the account attached by [`require_access`](super::require_access)
/// when the route is layered, otherwise authenticates from the header.
pub struct Auth(pub AuthenticatedAccount);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedAccount>().cloned() {
            return Ok(Auth(user));
        }

        let token = bearer_token(&parts.headers).ok_or(AuthError::NoToken)?;
        let user = authenticate_access(state, token)?;
        parts.extensions.insert(user.clone());
        Ok(Auth(user))
    }
}

/// Optional authentication extractor.
///
/// Yields `None` instead of rejecting when authentication fails for any
/// reason; used by public reads that personalise for a known viewer.
pub struct OptionalAuth(pub Option<AuthenticatedAccount>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match Auth::from_request_parts(parts, state).await {
            Ok(Auth(user)) => Ok(OptionalAuth(Some(user))),
            Err(_) => Ok(OptionalAuth(None)),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody {
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Refresh-token gate.
///
/// Consumes the request body, so it must be the last extractor of a handler.
/// On success carries the full stored account and the presented token.
pub struct RefreshAuth {
    pub account: Account,
    pub token: String,
}

impl FromRequest<AppState> for RefreshAuth {
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|_| AuthError::NoRefreshToken)?;
        let token = serde_json::from_slice::<RefreshBody>(&bytes)
            .ok()
            .and_then(|body| body.refresh_token)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::NoRefreshToken)?;

        let claims = state
            .tokens
            .verify_refresh(&token)
            .map_err(|_| AuthError::InvalidRefreshToken)?;

        let account = AccountRepository::new(&state.db)
            .find(&claims.sub)
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .ok_or(AuthError::InvalidRefreshToken)?;

        if account.refresh_token.as_deref() != Some(token.as_str()) {
            return Err(AuthError::InvalidRefreshToken);
        }

        Ok(RefreshAuth { account, token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::{Registration, SessionGrant};
    use axum::body::Body;
    use axum::http::Request as HttpRequest;

    async fn register(state: &AppState) -> SessionGrant {
        state
            .sessions
            .register(Registration {
                username: "alice",
                email: "alice@example.com",
                password: "password123",
                name: "Alice",
            })
            .await
            .unwrap()
    }

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = HttpRequest::builder().uri("/test");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn refresh_request(body: &str) -> Request {
        HttpRequest::builder()
            .method("POST")
            .uri("/refresh")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());
        headers.insert(AUTHORIZATION, "Basic abc".parse().unwrap());
        assert!(bearer_token(&headers).is_none());
        headers.insert(AUTHORIZATION, "Bearer ".parse().unwrap());
        assert!(bearer_token(&headers).is_none());
        headers.insert(AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[tokio::test]
    async fn auth_requires_header() {
        let (state, _dir) = AppState::for_tests();
        let mut parts = parts_with(None);
        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::NoToken)));
    }

    #[tokio::test]
    async fn auth_rejects_garbage() {
        let (state, _dir) = AppState::for_tests();
        let mut parts = parts_with(Some("Bearer garbage"));
        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn auth_loads_account() {
        let (state, _dir) = AppState::for_tests();
        let grant = register(&state).await;
        let mut parts = parts_with(Some(&format!("Bearer {}", grant.tokens.access_token)));

        let Auth(user) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.account.username, "alice");
        assert!(parts.extensions.get::<AuthenticatedAccount>().is_some());
    }

    #[tokio::test]
    async fn auth_rejects_deleted_account() {
        let (state, _dir) = AppState::for_tests();
        let token = state.tokens.issue_access("ghost", "ghost@example.com").unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {token}")));
        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::UserNotFound)));
    }

    #[tokio::test]
    async fn auth_prefers_extensions() {
        let (state, _dir) = AppState::for_tests();
        let grant = register(&state).await;
        let claims = state.tokens.verify_access(&grant.tokens.access_token).unwrap();
        let mut parts = parts_with(None);
        parts
            .extensions
            .insert(AuthenticatedAccount::new(&grant.account, &claims));

        let Auth(user) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.id(), grant.account.id);
    }

    #[tokio::test]
    async fn optional_auth_swallows_failures() {
        let (state, _dir) = AppState::for_tests();
        let mut parts = parts_with(Some("Bearer garbage"));
        let OptionalAuth(user) = OptionalAuth::from_request_parts(&mut parts, &state).await.unwrap();
        assert!(user.is_none());

        let grant = register(&state).await;
        let mut parts = parts_with(Some(&format!("Bearer {}", grant.tokens.access_token)));
        let OptionalAuth(user) = OptionalAuth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.unwrap().id(), grant.account.id);
    }

    #[tokio::test]
    async fn refresh_auth_checks_body_and_stored_token() {
        let (state, _dir) = AppState::for_tests();
        let grant = register(&state).await;

        let missing = RefreshAuth::from_request(refresh_request("{}"), &state).await;
        assert!(matches!(missing, Err(AuthError::NoRefreshToken)));

        let not_json = RefreshAuth::from_request(refresh_request("nope"), &state).await;
        assert!(matches!(not_json, Err(AuthError::NoRefreshToken)));

        let access_as_refresh = RefreshAuth::from_request(
            refresh_request(&format!(r#"{{"refreshToken":"{}"}}"#, grant.tokens.access_token)),
            &state,
        )
        .await;
        assert!(matches!(access_as_refresh, Err(AuthError::InvalidRefreshToken)));

        let ok = RefreshAuth::from_request(
            refresh_request(&format!(r#"{{"refreshToken":"{}"}}"#, grant.tokens.refresh_token)),
            &state,
        )
        .await
        .unwrap();
        assert_eq!(ok.account.id, grant.account.id);

        state.sessions.logout(&grant.account.id).unwrap();
        let after_logout = RefreshAuth::from_request(
            refresh_request(&format!(r#"{{"refreshToken":"{}"}}"#, grant.tokens.refresh_token)),
            &state,
        )
        .await;
        assert!(matches!(after_logout, Err(AuthError::InvalidRefreshToken)));
    }
}
