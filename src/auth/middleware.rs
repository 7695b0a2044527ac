// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session middleware for router subtrees.
//!
//! Verifies the bearer session once and stores the [`SessionClaims`] in the
//! request extensions, where the [`Auth`](super::Auth) extractor picks them up.
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/auth/session", get(session))
//!     .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_session));
//! ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::extractor::bearer_token;
use crate::state::AppState;

pub async fn require_session(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    let claims = match bearer_token(&parts).and_then(|token| state.auth.verify_session(token)) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error_code = e.error_code(), "Session rejected");
            return e.into_response();
        }
    };

    parts.extensions.insert(claims);
    next.run(Request::from_parts(parts, body)).await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{body::Body, http::StatusCode, routing::get, Extension, Router};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::claims::{IdentityClaims, SessionClaims};
    use crate::auth::wallet::tests::TEST_ADDRESS;
    use crate::state::tests::test_state;

    fn app(state: AppState) -> Router {
        Router::new()
            .route(
                "/protected",
                get(|Extension(claims): Extension<SessionClaims>| async move { claims.email }),
            )
            .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_session))
            .with_state(state)
    }

    #[tokio::test]
    async fn rejects_missing_and_invalid_sessions() {
        let (state, _dir) = test_state();
        let app = app(state);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/protected").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .header("Authorization", "Bearer garbage")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn passes_claims_to_handler() {
        let (state, _dir) = test_state();
        let identity = IdentityClaims {
            user_id: "u".to_string(),
            email: "alice@example.com".to_string(),
            name: None,
        };
        let token = state
            .auth
            .issue_session(&identity, TEST_ADDRESS, Duration::from_secs(60))
            .unwrap()
            .token;

        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .header("Authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"alice@example.com");
    }
}
