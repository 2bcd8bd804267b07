// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Local accounts with JWT sessions.
//!
//! ## Auth Flow
//!
//! 1. Client registers or logs in with email + password
//! 2. Server returns a short-lived access token and a long-lived refresh token
//! 3. Client sends `Authorization: Bearer <access token>` on every request
//! 4. When the access token expires, the client posts the refresh token to
//!    `/api/auth/refresh` for a new access token
//!
//! ## Security
//!
//! - Passwords are stored as Argon2id verifiers
//! - Access and refresh tokens use distinct HS256 secrets
//! - One refresh token per account; login replaces it, logout clears it
//! - Password reset tickets are stored hashed with an expiry

pub mod claims;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod password;
pub mod session;
pub mod tokens;

pub use claims::AuthenticatedAccount;
pub use error::AuthError;
pub use extractor::{Auth, OptionalAuth, RefreshAuth};
pub use middleware::{require_access, require_admin};
pub use password::PasswordError;
pub use session::{SessionError, SessionManager};
pub use tokens::{TokenError, TokenService};
