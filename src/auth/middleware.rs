// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Route-level gates composed by the router:
//!
//! ```rust,ignore
//! Router::new()
//!     .route("/stats", get(stats))
//!     .route_layer(middleware::from_fn(require_admin))
//!     .route_layer(middleware::from_fn_with_state(state.clone(), require_access));
//! ```
//!
//! Layers added later run first, so `require_access` wraps `require_admin`.
//! The admin gate on its own answers 401, never 403.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use super::extractor::{authenticate_access, bearer_token};
use super::{AuthError, AuthenticatedAccount};
use crate::state::AppState;

/// Access gate: requires a valid access token for an existing account and
/// attaches the [`AuthenticatedAccount`] to the request.
pub async fn require_access(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()) else {
        return AuthError::NoToken.into_response();
    };

    match authenticate_access(&state, token) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            debug!(error = %e, "Access gate rejected request");
            e.into_response()
        }
    }
}

/// Admin gate: must run after [`require_access`].
pub async fn require_admin(request: Request, next: Next) -> Response {
    match request.extensions().get::<AuthenticatedAccount>() {
        None => AuthError::NotAuthenticated.into_response(),
        Some(user) if !user.is_admin() => {
            debug!(account_id = %user.id(), "Admin gate rejected request");
            AuthError::Forbidden.into_response()
        }
        Some(_) => next.run(request).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    use crate::auth::session::Registration;

    fn gated(state: &AppState) -> Router {
        Router::new()
            .route("/admin", get(|| async { "ok" }))
            .route_layer(middleware::from_fn(require_admin))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_access))
            .with_state(state.clone())
    }

    fn admin_only() -> Router {
        Router::new()
            .route("/admin", get(|| async { "ok" }))
            .route_layer(middleware::from_fn(require_admin))
    }

    fn request(token: Option<&str>) -> Request {
        let mut builder = HttpRequest::builder().uri("/admin");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn admin_gate_alone_is_not_authenticated() {
        let response = admin_only().oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn gates_compose() {
        let (state, _dir) = AppState::for_tests();
        let grant = state
            .sessions
            .register(Registration {
                username: "member",
                email: "member@example.com",
                password: "password123",
                name: "Member",
            })
            .await
            .unwrap();

        let response = gated(&state).oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = gated(&state)
            .oneshot(request(Some(&grant.tokens.access_token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        state.sessions.promote_admin("member@example.com").unwrap();
        let response = gated(&state)
            .oneshot(request(Some(&grant.tokens.access_token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
