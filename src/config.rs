// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup into an [`AppConfig`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `5000` |
//! | `DATA_DIR` | Directory holding the redb database file | `./data` |
//! | `JWT_ACCESS_SECRET` | HMAC secret for access tokens | Required |
//! | `JWT_REFRESH_SECRET` | HMAC secret for refresh tokens | Required |
//! | `JWT_ACCESS_EXPIRY` | Access token lifetime (`15m`, `1h`, ...) | `15m` |
//! | `JWT_REFRESH_EXPIRY` | Refresh token lifetime | `7d` |
//! | `PASSWORD_RESET_EXPIRY` | Password reset ticket lifetime | `1h` |
//! | `CLIENT_URL` | Allowed CORS origin (permissive if unset) | Optional |
//! | `ADMIN_EMAIL` | Account promoted to admin at startup | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::path::PathBuf;

use chrono::Duration;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the data directory path.
///
/// The redb database file is created inside this directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const JWT_ACCESS_SECRET_ENV: &str = "JWT_ACCESS_SECRET";
pub const JWT_REFRESH_SECRET_ENV: &str = "JWT_REFRESH_SECRET";
pub const JWT_ACCESS_EXPIRY_ENV: &str = "JWT_ACCESS_EXPIRY";
pub const JWT_REFRESH_EXPIRY_ENV: &str = "JWT_REFRESH_EXPIRY";
pub const PASSWORD_RESET_EXPIRY_ENV: &str = "PASSWORD_RESET_EXPIRY";
pub const CLIENT_URL_ENV: &str = "CLIENT_URL";
pub const ADMIN_EMAIL_ENV: &str = "ADMIN_EMAIL";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_ACCESS_EXPIRY: &str = "15m";
pub const DEFAULT_REFRESH_EXPIRY: &str = "7d";
pub const DEFAULT_RESET_EXPIRY: &str = "1h";
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// File name of the database inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "social.redb";

/// Longest accepted token or ticket lifetime, in days.
pub const MAX_TTL_DAYS: i64 = 365;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ")]
    SharedSecret,
}

/// Application configuration resolved at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub reset_ttl: Duration,
    pub client_url: Option<String>,
    pub admin_email: Option<String>,
}

impl AppConfig {
    /// Load the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let access_secret =
            non_empty(JWT_ACCESS_SECRET_ENV).ok_or(ConfigError::Missing(JWT_ACCESS_SECRET_ENV))?;
        let refresh_secret = non_empty(JWT_REFRESH_SECRET_ENV)
            .ok_or(ConfigError::Missing(JWT_REFRESH_SECRET_ENV))?;
        if access_secret == refresh_secret {
            return Err(ConfigError::SharedSecret);
        }

        let port = match non_empty(PORT_ENV) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: PORT_ENV,
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let ttl = |name: &'static str, default: &str| -> Result<Duration, ConfigError> {
            let raw = non_empty(name).unwrap_or_else(|| default.to_string());
            parse_ttl(&raw).ok_or(ConfigError::Invalid { name, value: raw })
        };

        Ok(Self {
            host: non_empty(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            data_dir: PathBuf::from(
                non_empty(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
            ),
            access_secret,
            refresh_secret,
            access_ttl: ttl(JWT_ACCESS_EXPIRY_ENV, DEFAULT_ACCESS_EXPIRY)?,
            refresh_ttl: ttl(JWT_REFRESH_EXPIRY_ENV, DEFAULT_REFRESH_EXPIRY)?,
            reset_ttl: ttl(PASSWORD_RESET_EXPIRY_ENV, DEFAULT_RESET_EXPIRY)?,
            client_url: non_empty(CLIENT_URL_ENV),
            admin_email: non_empty(ADMIN_EMAIL_ENV).map(|e| e.trim().to_lowercase()),
        })
    }

    /// Full path of the redb database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    /// Bind address in `host:port` form.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Configuration used by unit tests: fixed secrets, default lifetimes.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            access_secret: "test-access-secret".to_string(),
            refresh_secret: "test-refresh-secret".to_string(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
            reset_ttl: Duration::hours(1),
            client_url: None,
            admin_email: None,
        }
    }
}

/// Parse a lifetime such as `30s`, `15m`, `1h` or `7d`.
///
/// A bare integer is read as seconds. Zero, negative and values above
/// [`MAX_TTL_DAYS`] are rejected.
pub fn parse_ttl(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (digits, unit) = match raw.char_indices().last()? {
        (i, c) if c.is_ascii_alphabetic() => (&raw[..i], c.to_ascii_lowercase()),
        _ => (raw, 's'),
    };
    let amount: i64 = digits.parse().ok().filter(|n| *n > 0)?;
    let ttl = match unit {
        's' => Duration::try_seconds(amount),
        'm' => Duration::try_minutes(amount),
        'h' => Duration::try_hours(amount),
        'd' => Duration::try_days(amount),
        _ => None,
    }?;
    let max = Duration::try_days(MAX_TTL_DAYS)?;
    (ttl <= max).then_some(ttl)
}
