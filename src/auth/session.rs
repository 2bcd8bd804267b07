// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Manager
//!
//! Registration, login, logout, access-token refresh and the password reset
//! flow.
//!
//! ## Refresh token lifecycle
//!
//! Each account stores exactly one refresh token. Register and login
//! overwrite it, logout clears it, and [`SessionManager::refresh`] only
//! accepts the stored value. A still-valid token that has been superseded is
//! therefore rejected. Refresh reissues the access token only; the refresh
//! token is not rotated.
//!
//! ## Password reset
//!
//! A reset ticket is 32 random bytes, base64url encoded. Only its SHA-256
//! hash and an expiry are stored on the account; the plaintext leaves this
//! module once and is never persisted or logged.

use std::sync::Arc;

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use tracing::info;

use super::password::{self, PasswordError};
use super::tokens::{TokenError, TokenPair, TokenService};
use crate::storage::repository::accounts::fold;
use crate::storage::{Account, AccountRepository, Database, StorageError};

const RESET_TICKET_BYTES: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Email or username already in use; carries the field name.
    #[error("{0} already in use")]
    Conflict(&'static str),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("invalid refresh token")]
    InvalidRefreshToken,

    #[error("invalid or expired reset token")]
    InvalidOrExpiredToken,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("reset ticket expiry out of range")]
    ExpiryOutOfRange,
}

/// Validated registration input.
#[derive(Debug, Clone)]
pub struct Registration<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub name: &'a str,
}

/// Result of a successful register or login.
#[derive(Debug, Clone)]
pub struct SessionGrant {
    pub account: Account,
    pub tokens: TokenPair,
}

pub struct SessionManager {
    db: Arc<Database>,
    tokens: Arc<TokenService>,
    reset_ttl: Duration,
}

impl SessionManager {
    pub fn new(db: Arc<Database>, tokens: Arc<TokenService>, reset_ttl: Duration) -> Self {
        Self {
            db,
            tokens,
            reset_ttl,
        }
    }

    fn accounts(&self) -> AccountRepository<'_> {
        AccountRepository::new(&self.db)
    }

    /// Create an account and open its first session.
    ///
    /// Email uniqueness is checked before username uniqueness.
    pub async fn register(&self, input: Registration<'_>) -> Result<SessionGrant, SessionError> {
        let repo = self.accounts();
        if repo.find_by_email(input.email)?.is_some() {
            return Err(SessionError::Conflict("email"));
        }
        if repo.find_by_username(input.username)?.is_some() {
            return Err(SessionError::Conflict("username"));
        }

        let verifier = password::hash_async(input.password.to_string()).await?;
        let mut account = Account::new(input.username, input.email, verifier, input.name);
        let tokens = self.tokens.issue_pair(&account.id, &account.email)?;
        account.refresh_token = Some(tokens.refresh_token.clone());

        self.accounts().create(&account).map_err(|e| match e {
            StorageError::AlreadyExists(field) => SessionError::Conflict(field),
            other => SessionError::Storage(other),
        })?;

        info!(account_id = %account.id, "Account registered");
        Ok(SessionGrant { account, tokens })
    }

    /// Authenticate by email and password.
    ///
    /// An unknown email and a wrong password fail identically. A successful
    /// login replaces any previously issued refresh token.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionGrant, SessionError> {
        let account = self
            .accounts()
            .find_by_email(email)?
            .ok_or(SessionError::InvalidCredentials)?;
        if !password::verify_async(password.to_string(), account.password_hash.clone()).await {
            return Err(SessionError::InvalidCredentials);
        }

        let tokens = self.tokens.issue_pair(&account.id, &account.email)?;
        let account = self
            .accounts()
            .modify(&account.id, |stored| {
                stored.refresh_token = Some(tokens.refresh_token.clone());
                true
            })
            .map_err(|e| match e {
                StorageError::NotFound(_) => SessionError::InvalidCredentials,
                other => SessionError::Storage(other),
            })?
            .ok_or(SessionError::InvalidCredentials)?;

        info!(account_id = %account.id, "Account logged in");
        Ok(SessionGrant { account, tokens })
    }

    /// Clear the stored refresh token. Repeating it is harmless.
    pub fn logout(&self, account_id: &str) -> Result<(), SessionError> {
        match self.accounts().set_refresh_token(account_id, None) {
            Ok(()) | Err(StorageError::NotFound(_)) => {
                info!(account_id, "Account logged out");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Issue a new access token for an account whose refresh token has
    /// already passed signature and expiry verification.
    ///
    /// The presented token must equal the one stored on the account.
    pub fn refresh(&self, account: &Account, presented: &str) -> Result<String, SessionError> {
        if account.refresh_token.as_deref() != Some(presented) {
            return Err(SessionError::InvalidRefreshToken);
        }
        Ok(self.tokens.issue_access(&account.id, &account.email)?)
    }

    /// Start a password reset.
    ///
    /// Returns the plaintext ticket for out-of-band delivery, or `None` when
    /// no account has this email. Callers must answer both cases the same way.
    pub fn forgot_password(&self, email: &str) -> Result<Option<String>, SessionError> {
        let repo = self.accounts();
        let Some(account) = repo.find_by_email(email)? else {
            info!("Password reset requested for unknown email");
            return Ok(None);
        };

        let ticket = generate_ticket()?;
        let ticket_hash = hash_ticket(&ticket);
        let expires = Utc::now()
            .checked_add_signed(self.reset_ttl)
            .ok_or(SessionError::ExpiryOutOfRange)?;
        match repo.modify(&account.id, |stored| {
            stored.reset_password_token = Some(ticket_hash);
            stored.reset_password_expires = Some(expires);
            true
        }) {
            Ok(_) => {}
            Err(StorageError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        info!(account_id = %account.id, "Password reset ticket issued");
        Ok(Some(ticket))
    }

    /// Complete a password reset with a previously issued ticket.
    ///
    /// The ticket is single use: both reset fields are cleared on success.
    /// Ticket and expiry are checked again in the write transaction, so two
    /// concurrent resets with one ticket cannot both succeed.
    pub async fn reset_password(&self, ticket: &str, new_password: &str) -> Result<(), SessionError> {
        let ticket_hash = hash_ticket(ticket);
        let account = self
            .accounts()
            .find_by_reset_hash(&ticket_hash)?
            .ok_or(SessionError::InvalidOrExpiredToken)?;
        if !ticket_is_live(&account, &ticket_hash) {
            return Err(SessionError::InvalidOrExpiredToken);
        }

        let verifier = password::hash_async(new_password.to_string()).await?;
        let changed = match self.accounts().modify(&account.id, |stored| {
            if !ticket_is_live(stored, &ticket_hash) {
                return false;
            }
            stored.password_hash = verifier;
            stored.reset_password_token = None;
            stored.reset_password_expires = None;
            true
        }) {
            Ok(changed) => changed,
            Err(StorageError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };
        if changed.is_none() {
            return Err(SessionError::InvalidOrExpiredToken);
        }

        info!(account_id = %account.id, "Password reset completed");
        Ok(())
    }

    /// Grant the admin flag to the account with this email, if it exists.
    pub fn promote_admin(&self, email: &str) -> Result<bool, SessionError> {
        let repo = self.accounts();
        match repo.find_by_email(&fold(email))? {
            Some(account) if account.is_admin => Ok(true),
            Some(account) => {
                repo.set_admin(&account.id, true)?;
                info!(account_id = %account.id, "Account promoted to admin");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn generate_ticket() -> Result<String, SessionError> {
    let mut bytes = [0u8; RESET_TICKET_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| PasswordError::Hashing("system random unavailable".to_string()))?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

fn ticket_is_live(account: &Account, ticket_hash: &str) -> bool {
    account.reset_password_token.as_deref() == Some(ticket_hash)
        && account
            .reset_password_expires
            .is_some_and(|expires| expires > Utc::now())
}

fn hash_ticket(ticket: &str) -> String {
    Base64UrlUnpadded::encode_string(&Sha256::digest(ticket.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::storage::temp_database;

    fn manager() -> (SessionManager, Arc<Database>, tempfile::TempDir) {
        let (db, dir) = temp_database();
        let db = Arc::new(db);
        let config = AppConfig::for_tests();
        let tokens = Arc::new(TokenService::from_config(&config));
        (
            SessionManager::new(db.clone(), tokens, config.reset_ttl),
            db,
            dir,
        )
    }

    fn alice() -> Registration<'static> {
        Registration {
            username: "Alice",
            email: "Alice@Example.com",
            password: "password123",
            name: "Alice",
        }
    }

    #[tokio::test]
    async fn register_stores_refresh_token_and_folds_identity() {
        let (sessions, db, _dir) = manager();
        let grant = sessions.register(alice()).await.unwrap();

        assert_eq!(grant.account.username, "alice");
        assert_eq!(grant.account.email, "alice@example.com");
        let stored = AccountRepository::new(&db).get(&grant.account.id).unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some(grant.tokens.refresh_token.as_str()));
        assert_ne!(stored.password_hash, "password123");
    }

    #[tokio::test]
    async fn register_conflicts_email_first() {
        let (sessions, _db, _dir) = manager();
        sessions.register(alice()).await.unwrap();

        let same_both = sessions.register(alice()).await;
        assert!(matches!(same_both, Err(SessionError::Conflict("email"))));

        let same_username = sessions
            .register(Registration {
                email: "other@example.com",
                ..alice()
            })
            .await;
        assert!(matches!(same_username, Err(SessionError::Conflict("username"))));

        let same_email = sessions
            .register(Registration {
                username: "someone_else",
                ..alice()
            })
            .await;
        assert!(matches!(same_email, Err(SessionError::Conflict("email"))));
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let (sessions, _db, _dir) = manager();
        sessions.register(alice()).await.unwrap();

        let unknown = sessions.login("nobody@example.com", "password123").await.unwrap_err();
        let wrong = sessions.login("alice@example.com", "wrong-password").await.unwrap_err();
        assert!(matches!(unknown, SessionError::InvalidCredentials));
        assert!(matches!(wrong, SessionError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn second_login_supersedes_first_refresh_token() {
        let (sessions, db, _dir) = manager();
        sessions.register(alice()).await.unwrap();

        let first = sessions.login("alice@example.com", "password123").await.unwrap();
        let second = sessions.login("ALICE@example.com", "password123").await.unwrap();
        assert_ne!(first.tokens.refresh_token, second.tokens.refresh_token);

        let account = AccountRepository::new(&db).get(&first.account.id).unwrap();
        assert!(matches!(
            sessions.refresh(&account, &first.tokens.refresh_token),
            Err(SessionError::InvalidRefreshToken)
        ));
        assert!(sessions.refresh(&account, &second.tokens.refresh_token).is_ok());
    }

    #[tokio::test]
    async fn logout_clears_refresh_token_idempotently() {
        let (sessions, db, _dir) = manager();
        let grant = sessions.register(alice()).await.unwrap();

        sessions.logout(&grant.account.id).unwrap();
        sessions.logout(&grant.account.id).unwrap();
        sessions.logout("missing-account").unwrap();

        let account = AccountRepository::new(&db).get(&grant.account.id).unwrap();
        assert!(account.refresh_token.is_none());
        assert!(sessions.refresh(&account, &grant.tokens.refresh_token).is_err());
    }

    #[tokio::test]
    async fn reset_flow_is_single_use() {
        let (sessions, db, _dir) = manager();
        let grant = sessions.register(alice()).await.unwrap();

        assert!(sessions.forgot_password("nobody@example.com").unwrap().is_none());
        let ticket = sessions.forgot_password("alice@example.com").unwrap().unwrap();

        let stored = AccountRepository::new(&db).get(&grant.account.id).unwrap();
        assert_ne!(stored.reset_password_token.as_deref(), Some(ticket.as_str()));
        assert!(stored.reset_password_expires.is_some());

        sessions.reset_password(&ticket, "new-password-1").await.unwrap();
        assert!(sessions.login("alice@example.com", "new-password-1").await.is_ok());
        assert!(matches!(
            sessions.login("alice@example.com", "password123").await,
            Err(SessionError::InvalidCredentials)
        ));

        let cleared = AccountRepository::new(&db).get(&grant.account.id).unwrap();
        assert!(cleared.reset_password_token.is_none());
        assert!(cleared.reset_password_expires.is_none());
        assert!(matches!(
            sessions.reset_password(&ticket, "another-password").await,
            Err(SessionError::InvalidOrExpiredToken)
        ));
    }

    #[tokio::test]
    async fn expired_ticket_leaves_password_unchanged() {
        let (sessions, db, _dir) = manager();
        let grant = sessions.register(alice()).await.unwrap();
        let ticket = sessions.forgot_password("alice@example.com").unwrap().unwrap();

        let repo = AccountRepository::new(&db);
        repo.modify(&grant.account.id, |account| {
            account.reset_password_expires = Some(Utc::now() - Duration::minutes(1));
            true
        })
        .unwrap();
        let verifier_before = repo.get(&grant.account.id).unwrap().password_hash;

        assert!(matches!(
            sessions.reset_password(&ticket, "new-password-1").await,
            Err(SessionError::InvalidOrExpiredToken)
        ));
        assert_eq!(repo.get(&grant.account.id).unwrap().password_hash, verifier_before);
    }

    #[tokio::test]
    async fn newer_ticket_replaces_older() {
        let (sessions, _db, _dir) = manager();
        sessions.register(alice()).await.unwrap();
        let old = sessions.forgot_password("alice@example.com").unwrap().unwrap();
        let new = sessions.forgot_password("alice@example.com").unwrap().unwrap();

        assert!(sessions.reset_password(&old, "new-password-1").await.is_err());
        assert!(sessions.reset_password(&new, "new-password-1").await.is_ok());
    }

    #[tokio::test]
    async fn login_after_forgot_password_keeps_ticket() {
        let (sessions, _db, _dir) = manager();
        sessions.register(alice()).await.unwrap();
        let ticket = sessions.forgot_password("alice@example.com").unwrap().unwrap();

        sessions.login("alice@example.com", "password123").await.unwrap();
        sessions.promote_admin("alice@example.com").unwrap();

        sessions.reset_password(&ticket, "new-password-1").await.unwrap();
        assert!(sessions.login("alice@example.com", "new-password-1").await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_resets_with_one_ticket_succeed_once() {
        let (sessions, _db, _dir) = manager();
        sessions.register(alice()).await.unwrap();
        let ticket = sessions.forgot_password("alice@example.com").unwrap().unwrap();

        let (first, second) = tokio::join!(
            sessions.reset_password(&ticket, "first-password"),
            sessions.reset_password(&ticket, "second-password"),
        );
        assert_eq!(
            [first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(),
            1
        );
    }

    #[tokio::test]
    async fn promote_admin_sets_flag() {
        let (sessions, db, _dir) = manager();
        let grant = sessions.register(alice()).await.unwrap();

        assert!(!sessions.promote_admin("nobody@example.com").unwrap());
        assert!(sessions.promote_admin("ALICE@example.com").unwrap());
        assert!(AccountRepository::new(&db).get(&grant.account.id).unwrap().is_admin);
    }
}
