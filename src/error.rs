// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP error type shared by all handlers.
//!
//! Body shape: `{"error": "...", "error_code": "..."}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::AuthError;
use crate::storage::{ConstraintViolation, StorageError};

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_code: &'static str,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "conflict", message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "upstream_error", message)
    }

    /// Internal failure; the detail is logged, never returned.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(error = %message, "Internal server error");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "An internal error occurred",
        )
    }
}

impl From<ConstraintViolation> for ApiError {
    fn from(violation: ConstraintViolation) -> Self {
        let status = match violation {
            ConstraintViolation::Unique { .. } => StatusCode::CONFLICT,
            ConstraintViolation::Check { .. } | ConstraintViolation::ForeignKey { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        };
        let code = match violation.kind() {
            "unique" => "unique_violation",
            "check" => "check_violation",
            _ => "foreign_key_violation",
        };
        Self::new(status, code, violation.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Constraint(violation) => violation.into(),
            StorageError::NotFound(what) => Self::not_found(format!("{what} not found")),
            StorageError::PermissionDenied { resource, .. } => {
                Self::forbidden(format!("Not allowed to modify this {resource}"))
            }
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if let AuthError::Internal(detail) = &err {
            return Self::internal(detail.clone());
        }
        Self::new(err.status_code(), err.error_code(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.code,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);

        let unp = ApiError::unprocessable("oops");
        assert_eq!(unp.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data","error_code":"bad_request"}"#);
    }

    #[test]
    fn constraint_violations_map_to_client_errors() {
        let unique: ApiError = StorageError::from(ConstraintViolation::unique("users", "email")).into();
        assert_eq!(unique.status, StatusCode::CONFLICT);
        assert_eq!(unique.code, "unique_violation");

        let check: ApiError =
            StorageError::from(ConstraintViolation::check("properties", "ck_properties_price_positive")).into();
        assert_eq!(check.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(check.code, "check_violation");

        let fk: ApiError =
            StorageError::from(ConstraintViolation::foreign_key("properties", "owner_id")).into();
        assert_eq!(fk.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(fk.code, "foreign_key_violation");
    }

    #[test]
    fn storage_not_found_and_permission_map() {
        let nf: ApiError = StorageError::NotFound("Property p1".into()).into();
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "Property p1 not found");

        let denied: ApiError = StorageError::PermissionDenied {
            user_id: "u".into(),
            resource: "property".into(),
        }
        .into();
        assert_eq!(denied.status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn auth_errors_keep_their_code() {
        let err: ApiError = AuthError::SessionExpired.into();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.code, "session_expired");

        let internal: ApiError = AuthError::Internal("signing failed".into()).into();
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.message, "An internal error occurred");
    }
}
