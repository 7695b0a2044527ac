// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
///
/// Every verification step of the login pipeline and of session checks
/// returns one of these. None of them are fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No authorization header present
    MissingAuthHeader,
    /// Invalid authorization header format
    InvalidAuthHeader,
    /// Identity provider rejected the ID token (expired, malformed, wrong audience, timeout)
    InvalidToken(String),
    /// Wallet signature did not prove control of the address
    InvalidSignature(String),
    /// Session token signature is valid but it has expired
    SessionExpired,
    /// Session token is tampered or malformed
    SessionInvalid(String),
    /// Insufficient permissions
    InsufficientPermissions,
    /// Internal error
    Internal(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::InvalidToken(_) => "invalid_token",
            AuthError::InvalidSignature(_) => "invalid_signature",
            AuthError::SessionExpired => "session_expired",
            AuthError::SessionInvalid(_) => "session_invalid",
            AuthError::InsufficientPermissions => "insufficient_permissions",
            AuthError::Internal(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::InvalidToken(_)
            | AuthError::InvalidSignature(_)
            | AuthError::SessionExpired
            | AuthError::SessionInvalid(_) => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader => write!(f, "Authorization header is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::InvalidToken(msg) => write!(f, "Invalid identity token: {msg}"),
            AuthError::InvalidSignature(msg) => write!(f, "Invalid wallet signature: {msg}"),
            AuthError::SessionExpired => write!(f, "Session has expired"),
            AuthError::SessionInvalid(msg) => write!(f, "Invalid session token: {msg}"),
            AuthError::InsufficientPermissions => {
                write!(f, "Insufficient permissions for this operation")
            }
            AuthError::Internal(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
