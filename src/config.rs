// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the validated settings built
//! from them at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding the redb database file | `./data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `GOOGLE_CLIENT_ID` | OAuth client ID that ID tokens must be issued for | Required |
//! | `JWT_SECRET` | Session signing secret (at least 32 bytes) | Required |
//! | `JWT_ALGORITHM` | Session signing algorithm (`HS256`, `HS384`, `HS512`) | `HS256` |
//! | `ACCESS_TOKEN_EXPIRE_MINUTES` | Session lifetime (at most one year) | `30` |
//! | `RATE_LIMIT_REQUESTS` | Requests allowed per client per window | `100` |
//! | `RATE_LIMIT_WINDOW_SECONDS` | Rate limit window length | `60` |
//! | `RPC_URL` | EVM JSON-RPC endpoint for confirmation sync | Optional |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; HTTPS when both are set | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::time::Duration;

use jsonwebtoken::Algorithm;

pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const GOOGLE_CLIENT_ID_ENV: &str = "GOOGLE_CLIENT_ID";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_ALGORITHM_ENV: &str = "JWT_ALGORITHM";
pub const TOKEN_TTL_MINUTES_ENV: &str = "ACCESS_TOKEN_EXPIRE_MINUTES";
pub const RATE_LIMIT_REQUESTS_ENV: &str = "RATE_LIMIT_REQUESTS";
pub const RATE_LIMIT_WINDOW_ENV: &str = "RATE_LIMIT_WINDOW_SECONDS";
pub const RPC_URL_ENV: &str = "RPC_URL";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TOKEN_TTL_MINUTES: u64 = 30;
pub const DEFAULT_RATE_LIMIT_REQUESTS: usize = 100;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Database file name inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "rental_registry.redb";

/// Longest accepted session lifetime (one year).
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Minimum session secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Configuration errors reported at startup.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name,
            reason: reason.into(),
        }
    }
}

/// Authentication settings, validated on construction.
#[derive(Clone)]
pub struct AuthSettings {
    pub google_client_id: String,
    pub jwt_secret: String,
    pub jwt_algorithm: Algorithm,
    pub token_ttl: Duration,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("google_client_id", &self.google_client_id)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

impl AuthSettings {
    pub fn new(
        google_client_id: impl Into<String>,
        jwt_secret: impl Into<String>,
        jwt_algorithm: Algorithm,
        token_ttl: Duration,
    ) -> Result<Self, ConfigError> {
        let google_client_id = google_client_id.into();
        let jwt_secret = jwt_secret.into();

        if google_client_id.trim().is_empty() {
            return Err(ConfigError::invalid(GOOGLE_CLIENT_ID_ENV, "must not be empty"));
        }
        if jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::invalid(
                JWT_SECRET_ENV,
                format!("must be at least {MIN_SECRET_LEN} bytes"),
            ));
        }
        if !matches!(jwt_algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(ConfigError::invalid(
                JWT_ALGORITHM_ENV,
                format!("{jwt_algorithm:?} is not an HMAC algorithm"),
            ));
        }
        if token_ttl.as_secs() == 0 {
            return Err(ConfigError::invalid(TOKEN_TTL_MINUTES_ENV, "must be positive"));
        }
        if token_ttl > MAX_TOKEN_TTL {
            return Err(ConfigError::invalid(
                TOKEN_TTL_MINUTES_ENV,
                format!("must not exceed {} minutes", MAX_TOKEN_TTL.as_secs() / 60),
            ));
        }

        Ok(Self {
            google_client_id,
            jwt_secret,
            jwt_algorithm,
            token_ttl,
        })
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let client_id = get(GOOGLE_CLIENT_ID_ENV).ok_or(ConfigError::Missing(GOOGLE_CLIENT_ID_ENV))?;
        let secret = get(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;
        let algorithm = match get(JWT_ALGORITHM_ENV) {
            Some(name) => name
                .parse::<Algorithm>()
                .map_err(|_| ConfigError::invalid(JWT_ALGORITHM_ENV, format!("unknown algorithm {name}")))?,
            None => Algorithm::HS256,
        };
        let minutes: u64 = parse_or(&get, TOKEN_TTL_MINUTES_ENV, DEFAULT_TOKEN_TTL_MINUTES)?;
        let seconds = minutes
            .checked_mul(60)
            .ok_or_else(|| ConfigError::invalid(TOKEN_TTL_MINUTES_ENV, "out of range"))?;

        Self::new(client_id, secret, algorithm, Duration::from_secs(seconds))
    }
}

/// Fixed-window rate limit settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    pub max_requests: usize,
    pub window: Duration,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_RATE_LIMIT_REQUESTS,
            window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
        }
    }
}

/// Server-level settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub rpc_url: Option<String>,
    pub tls_cert_path: Option<PathBuf>,
    pub tls_key_path: Option<PathBuf>,
    pub rate_limit: RateLimitSettings,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let max_requests = parse_or(&get, RATE_LIMIT_REQUESTS_ENV, DEFAULT_RATE_LIMIT_REQUESTS)?;
        let window_secs = parse_or(&get, RATE_LIMIT_WINDOW_ENV, DEFAULT_RATE_LIMIT_WINDOW_SECS)?;
        if max_requests == 0 {
            return Err(ConfigError::invalid(RATE_LIMIT_REQUESTS_ENV, "must be positive"));
        }
        if window_secs == 0 {
            return Err(ConfigError::invalid(RATE_LIMIT_WINDOW_ENV, "must be positive"));
        }

        let tls_cert_path = get(TLS_CERT_PATH_ENV).map(PathBuf::from);
        let tls_key_path = get(TLS_KEY_PATH_ENV).map(PathBuf::from);
        if tls_cert_path.is_some() != tls_key_path.is_some() {
            return Err(ConfigError::invalid(
                TLS_CERT_PATH_ENV,
                "TLS_CERT_PATH and TLS_KEY_PATH must be set together",
            ));
        }

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(&get, PORT_ENV, DEFAULT_PORT)?,
            data_dir: PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())),
            rpc_url: get(RPC_URL_ENV).filter(|url| !url.trim().is_empty()),
            tls_cert_path,
            tls_key_path,
            rate_limit: RateLimitSettings {
                max_requests,
                window: Duration::from_secs(window_secs),
            },
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::invalid(name, format!("cannot parse {raw:?}"))),
        None => Ok(default),
    }
}
