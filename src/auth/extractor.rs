// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for session-authenticated requests.
//!
//! ```rust,ignore
//! async fn my_handler(Auth(session): Auth) -> impl IntoResponse {
//!     // session is SessionClaims
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::{AuthError, Role, SessionClaims};
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::{User, UserRepository};

/// Extractor for a verified session.
///
/// Uses claims already placed in the request extensions by
/// [`require_session`](super::middleware::require_session) when present,
/// otherwise verifies the `Authorization: Bearer` header.
pub struct Auth(pub SessionClaims);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(claims) = parts.extensions.get::<SessionClaims>().cloned() {
            return Ok(Auth(claims));
        }

        let token = bearer_token(parts)?;
        let claims = state.auth.verify_session(token)?;
        Ok(Auth(claims))
    }
}

/// Extract the bearer token from the `Authorization` header.
pub(crate) fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidAuthHeader)
}

/// The stored account behind the session (matched by session email).
///
/// Rejects with 403 when the session is valid but no active account exists.
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(claims) = Auth::from_request_parts(parts, state).await?;

        let user = UserRepository::new(&state.db)
            .find_by_email(&claims.email)?
            .filter(|u| u.is_active)
            .ok_or_else(|| ApiError::forbidden("No active account for this session"))?;

        Ok(CurrentUser(user))
    }
}

/// Extractor that requires an admin account.
pub struct AdminOnly(pub User);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if !user.role.has_privilege(Role::Admin) {
            return Err(AuthError::InsufficientPermissions.into());
        }

        Ok(AdminOnly(user))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::{Request, StatusCode};

    use super::*;
    use crate::auth::claims::IdentityClaims;
    use crate::auth::wallet::tests::TEST_ADDRESS;
    use crate::state::tests::test_state;

    fn parts_with(header: Option<String>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(value) = header {
            builder = builder.header("Authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn session_for(state: &AppState, email: &str) -> String {
        let identity = IdentityClaims {
            user_id: "google-sub-1".to_string(),
            email: email.to_string(),
            name: None,
        };
        state
            .auth
            .issue_session(&identity, TEST_ADDRESS, Duration::from_secs(600))
            .unwrap()
            .token
    }

    #[tokio::test]
    async fn auth_extractor_requires_auth_header() {
        let (state, _dir) = test_state();
        let result = Auth::from_request_parts(&mut parts_with(None), &state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));

        let result =
            Auth::from_request_parts(&mut parts_with(Some("Basic abc".into())), &state).await;
        assert!(matches!(result, Err(AuthError::InvalidAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_verifies_session() {
        let (state, _dir) = test_state();
        let token = session_for(&state, "alice@example.com");

        let Auth(claims) =
            Auth::from_request_parts(&mut parts_with(Some(format!("Bearer {token}"))), &state)
                .await
                .unwrap();
        assert_eq!(claims.email, "alice@example.com");

        let result =
            Auth::from_request_parts(&mut parts_with(Some("Bearer not.a.jwt".into())), &state).await;
        assert!(matches!(result, Err(AuthError::SessionInvalid(_))));
    }

    #[tokio::test]
    async fn auth_extractor_prefers_extensions() {
        let (state, _dir) = test_state();
        let mut parts = parts_with(None);
        let claims = SessionClaims {
            user_id: "from-middleware".to_string(),
            email: "m@example.com".to_string(),
            wallet_address: TEST_ADDRESS.to_string(),
            iat: 0,
            exp: 0,
        };
        parts.extensions.insert(claims.clone());

        let Auth(found) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(found, claims);
    }

    #[tokio::test]
    async fn current_user_requires_an_account() {
        let (state, _dir) = test_state();
        let token = session_for(&state, "alice@example.com");

        let err = CurrentUser::from_request_parts(&mut parts_with(Some(format!("Bearer {token}"))), &state)
            .await
            .err()
            .unwrap();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let user = User::new("Alice@Example.com", "Alice", "hash", Role::Tenant, None);
        UserRepository::new(&state.db).create(&user).unwrap();

        let CurrentUser(found) =
            CurrentUser::from_request_parts(&mut parts_with(Some(format!("Bearer {token}"))), &state)
                .await
                .unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn admin_only_rejects_non_admins() {
        let (state, _dir) = test_state();
        let repo = UserRepository::new(&state.db);
        repo.create(&User::new("tenant@example.com", "T", "hash", Role::Tenant, None))
            .unwrap();
        repo.create(&User::new("admin@example.com", "A", "hash", Role::Admin, None))
            .unwrap();

        let token = session_for(&state, "tenant@example.com");
        let err = AdminOnly::from_request_parts(&mut parts_with(Some(format!("Bearer {token}"))), &state)
            .await
            .err()
            .unwrap();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let token = session_for(&state, "admin@example.com");
        let AdminOnly(admin) =
            AdminOnly::from_request_parts(&mut parts_with(Some(format!("Bearer {token}"))), &state)
                .await
                .unwrap();
        assert_eq!(admin.role, Role::Admin);
    }
}
