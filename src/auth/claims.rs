// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authenticated account attached to the request context.

use crate::models::AccountView;
use crate::storage::Account;

use super::tokens::AccessClaims;

/// Account resolved from a valid access token.
///
/// Holds the public view only; the password verifier and refresh token are
/// dropped on load.
#[derive(Debug, Clone)]
pub struct AuthenticatedAccount {
    pub account: AccountView,
    /// Access token expiration (Unix timestamp)
    pub expires_at: i64,
}

impl AuthenticatedAccount {
    pub fn new(account: &Account, claims: &AccessClaims) -> Self {
        Self {
            account: AccountView::from(account),
            expires_at: claims.exp,
        }
    }

    pub fn id(&self) -> &str {
        &self.account.id
    }

    pub fn is_admin(&self) -> bool {
        self.account.is_admin
    }
}
