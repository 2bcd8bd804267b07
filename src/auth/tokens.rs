// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access and refresh token issuance and verification.
//!
//! Both token classes are HS256 JWTs, signed with separate secrets and
//! tagged with a `token_use` claim, so neither class ever verifies as the
//! other. Every verification failure collapses into
//! [`TokenError::InvalidToken`]: callers cannot tell an expired token from a
//! forged one.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

/// Clock skew tolerance (30 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 30;

const ACCESS_USE: &str = "access";
const REFRESH_USE: &str = "refresh";

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token is invalid or expired")]
    InvalidToken,

    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    /// Account id
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    pub token_use: String,
}

/// Claims carried by a refresh token.
///
/// `jti` makes every issued refresh token distinct, even two issued for the
/// same account within the same second.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshClaims {
    pub sub: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub token_use: String,
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningKey {
    fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

/// Issues and verifies both token classes.
pub struct TokenService {
    access: SigningKey,
    refresh: SigningKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(
        access_secret: &str,
        refresh_secret: &str,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Self {
            access: SigningKey::new(access_secret, access_ttl),
            refresh: SigningKey::new(refresh_secret, refresh_ttl),
            validation,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.access_secret,
            &config.refresh_secret,
            config.access_ttl,
            config.refresh_ttl,
        )
    }

    pub fn issue_access(&self, account_id: &str, email: &str) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: account_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: expiry(now, self.access.ttl)?,
            token_use: ACCESS_USE.to_string(),
        };
        sign(&claims, &self.access.encoding)
    }

    pub fn issue_refresh(&self, account_id: &str) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: account_id.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expiry(now, self.refresh.ttl)?,
            token_use: REFRESH_USE.to_string(),
        };
        sign(&claims, &self.refresh.encoding)
    }

    pub fn issue_pair(&self, account_id: &str, email: &str) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue_access(account_id, email)?,
            refresh_token: self.issue_refresh(account_id)?,
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let claims: AccessClaims = self.verify(token, &self.access.decoding)?;
        if claims.token_use != ACCESS_USE {
            return Err(TokenError::InvalidToken);
        }
        Ok(claims)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let claims: RefreshClaims = self.verify(token, &self.refresh.decoding)?;
        if claims.token_use != REFRESH_USE {
            return Err(TokenError::InvalidToken);
        }
        Ok(claims)
    }

    fn verify<T>(&self, token: &str, key: &DecodingKey) -> Result<T, TokenError>
    where
        T: serde::de::DeserializeOwned,
    {
        if !has_jwt_shape(token) {
            return Err(TokenError::InvalidToken);
        }
        decode::<T>(token, key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| TokenError::InvalidToken)
    }
}

/// `now + ttl` as a unix timestamp, without overflowing the calendar.
fn expiry(now: DateTime<Utc>, ttl: Duration) -> Result<i64, TokenError> {
    now.checked_add_signed(ttl)
        .map(|exp| exp.timestamp())
        .ok_or_else(|| TokenError::Signing("token lifetime out of range".to_string()))
}

fn sign<T: Serialize>(claims: &T, key: &EncodingKey) -> Result<String, TokenError> {
    encode(&Header::new(Algorithm::HS256), claims, key).map_err(|e| TokenError::Signing(e.to_string()))
}

/// Three non-empty dot-separated base64url segments.
fn has_jwt_shape(token: &str) -> bool {
    let segments: Vec<&str> = token.split('.').collect();
    segments.len() == 3
        && segments.iter().all(|segment| {
            !segment.is_empty()
                && segment
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::from_config(&AppConfig::for_tests())
    }

    #[test]
    fn access_round_trip_carries_claims() {
        let tokens = service();
        let token = tokens.issue_access("acct-1", "a@example.com").unwrap();
        let claims = tokens.verify_access(&token).unwrap();

        let now = Utc::now().timestamp();
        assert_eq!(claims.sub, "acct-1");
        assert_eq!(claims.email, "a@example.com");
        assert!(claims.exp > now);
        assert!(claims.iat <= now);
    }

    #[test]
    fn refresh_round_trip_carries_claims() {
        let tokens = service();
        let token = tokens.issue_refresh("acct-1").unwrap();
        let claims = tokens.verify_refresh(&token).unwrap();
        assert_eq!(claims.sub, "acct-1");
        assert!(claims.exp > Utc::now().timestamp());
        assert!(claims.iat > 0);
    }

    #[test]
    fn refresh_tokens_are_unique() {
        let tokens = service();
        let first = tokens.issue_refresh("acct-1").unwrap();
        let second = tokens.issue_refresh("acct-1").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn classes_are_not_interchangeable() {
        let tokens = service();
        let access = tokens.issue_access("acct-1", "a@example.com").unwrap();
        let refresh = tokens.issue_refresh("acct-1").unwrap();
        assert!(matches!(tokens.verify_refresh(&access), Err(TokenError::InvalidToken)));
        assert!(matches!(tokens.verify_access(&refresh), Err(TokenError::InvalidToken)));
    }

    #[test]
    fn same_secret_is_still_separated_by_token_use() {
        let tokens = TokenService::new("shared", "shared", Duration::minutes(5), Duration::days(1));
        let refresh = tokens.issue_refresh("acct-1").unwrap();
        assert!(tokens.verify_access(&refresh).is_err());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let tokens = service();
        for garbage in ["", "garbage", "a.b", "a.b.c.d", "a..c", "a.b.c d", "héllo.wörld.!!"] {
            assert!(tokens.verify_access(garbage).is_err(), "{garbage}");
            assert!(tokens.verify_refresh(garbage).is_err(), "{garbage}");
        }
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let tokens = service();
        let token = tokens.issue_access("acct-1", "a@example.com").unwrap();
        let (body, signature) = token.rsplit_once('.').unwrap();
        let flipped = if signature.starts_with('A') { 'B' } else { 'A' };
        let tampered = format!("{body}.{flipped}{}", &signature[1..]);
        assert!(matches!(tokens.verify_access(&tampered), Err(TokenError::InvalidToken)));

        let refresh = tokens.issue_refresh("acct-1").unwrap();
        let (body, signature) = refresh.rsplit_once('.').unwrap();
        let flipped = if signature.starts_with('A') { 'B' } else { 'A' };
        let tampered = format!("{body}.{flipped}{}", &signature[1..]);
        assert!(matches!(tokens.verify_refresh(&tampered), Err(TokenError::InvalidToken)));
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let ours = service();
        let theirs = TokenService::new("other-a", "other-r", Duration::minutes(5), Duration::days(1));
        let token = theirs.issue_access("acct-1", "a@example.com").unwrap();
        assert!(ours.verify_access(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = TokenService::new(
            "test-access-secret",
            "test-refresh-secret",
            Duration::minutes(-5),
            Duration::minutes(-5),
        );
        let access = tokens.issue_access("acct-1", "a@example.com").unwrap();
        let refresh = tokens.issue_refresh("acct-1").unwrap();
        assert!(matches!(tokens.verify_access(&access), Err(TokenError::InvalidToken)));
        assert!(matches!(tokens.verify_refresh(&refresh), Err(TokenError::InvalidToken)));
    }

    #[test]
    fn lifetime_past_the_calendar_is_an_error() {
        let tokens = TokenService::new(
            "test-access-secret",
            "test-refresh-secret",
            Duration::days(100_000_000),
            Duration::days(100_000_000),
        );
        assert!(matches!(
            tokens.issue_access("acct-1", "a@example.com"),
            Err(TokenError::Signing(_))
        ));
        assert!(matches!(tokens.issue_refresh("acct-1"), Err(TokenError::Signing(_))));
    }
}
