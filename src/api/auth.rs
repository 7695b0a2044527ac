// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login and session endpoints.

use axum::{extract::State, Json};

use crate::{
    auth::{Auth, SessionClaims},
    error::ApiError,
    models::{LoginRequest, TokenResponse},
    state::AppState,
    storage::UserRepository,
};

/// Exchange an identity token plus a wallet signature for a session.
///
/// When an account with the token's email exists and has no wallet yet, the
/// proven wallet is linked to it.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let session = state
        .auth
        .authenticate(
            &request.id_token,
            &request.wallet_address,
            &request.signature,
            &request.message,
        )
        .await?;

    link_wallet(&state, &session.claims);

    Ok(Json(TokenResponse::bearer(session.token, session.expires_in)))
}

/// Best effort: a failed link does not fail the login.
fn link_wallet(state: &AppState, claims: &SessionClaims) {
    let repo = UserRepository::new(&state.db);
    let mut user = match repo.find_by_email(&claims.email) {
        Ok(Some(user)) if user.wallet_address.is_none() => user,
        Ok(_) => return,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to look up account for wallet link");
            return;
        }
    };

    user.wallet_address = Some(claims.wallet_address.clone());
    match repo.update(&user) {
        Ok(()) => tracing::info!(user_id = %user.id, wallet = %claims.wallet_address, "Wallet linked to account"),
        Err(e) => tracing::warn!(user_id = %user.id, error = %e, "Wallet link rejected"),
    }
}

/// Return the claims of the presented session.
pub async fn session(Auth(claims): Auth) -> Json<SessionClaims> {
    Json(claims)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::api::test_support::{body_json, request, test_app};
    use crate::auth::wallet::tests::{personal_sign, TEST_ADDRESS};
    use crate::auth::Role;
    use crate::storage::{User, UserRepository};

    fn login_body(id_token: &str, signature: &str) -> serde_json::Value {
        json!({
            "id_token": id_token,
            "wallet_address": TEST_ADDRESS,
            "signature": signature,
            "message": "Sign in to Rental Registry",
        })
    }

    #[tokio::test]
    async fn login_issues_bearer_token_and_links_wallet() {
        let (app, state, _dir) = test_app();
        let user = User::new("alice@example.com", "Alice", "hash", Role::Tenant, None);
        UserRepository::new(&state.db).create(&user).unwrap();

        let body = login_body("good-id-token", &personal_sign("Sign in to Rental Registry"));
        let response = app
            .clone()
            .oneshot(request(Method::POST, "/v1/auth/login", None, Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["token_type"], "bearer");
        assert_eq!(json["expires_in"], 1800);
        let token = json["access_token"].as_str().unwrap().to_string();

        let linked = UserRepository::new(&state.db).get(&user.id).unwrap();
        assert_eq!(linked.wallet_address.as_deref(), Some(TEST_ADDRESS));

        let response = app
            .oneshot(request(Method::GET, "/v1/auth/session", Some(&token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let claims = body_json(response).await;
        assert_eq!(claims["email"], "alice@example.com");
        assert_eq!(claims["wallet_address"], TEST_ADDRESS);
    }

    #[tokio::test]
    async fn login_rejects_bad_factors() {
        let (app, _state, _dir) = test_app();
        let signature = personal_sign("Sign in to Rental Registry");

        let response = app
            .clone()
            .oneshot(request(Method::POST, "/v1/auth/login", None, Some(login_body("forged", &signature))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error_code"], "invalid_token");

        let wrong = personal_sign("a different message");
        let response = app
            .oneshot(request(Method::POST, "/v1/auth/login", None, Some(login_body("good-id-token", &wrong))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error_code"], "invalid_signature");
    }

    #[tokio::test]
    async fn session_endpoint_requires_token() {
        let (app, _state, _dir) = test_app();
        let response = app
            .oneshot(request(Method::GET, "/v1/auth/session", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
