// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{
    auth::require_session,
    middleware::{rate_limit, request_logger, security_headers},
    state::AppState,
};

pub mod agreements;
pub mod auth;
pub mod health;
pub mod properties;
pub mod transactions;
pub mod users;

pub fn router(state: AppState) -> Router {
    // Routes whose every method needs a session
    let session_routes = Router::new()
        .route("/auth/session", get(auth::session))
        .route("/users/me", get(users::get_current_user))
        .route(
            "/rental-agreements",
            get(agreements::list_agreements).post(agreements::create_agreement),
        )
        .route(
            "/rental-agreements/{agreement_id}",
            get(agreements::get_agreement)
                .patch(agreements::update_agreement)
                .delete(agreements::delete_agreement),
        )
        .route(
            "/transactions",
            get(transactions::list_transactions).post(transactions::create_transaction),
        )
        .route(
            "/transactions/{transaction_id}",
            get(transactions::get_transaction)
                .patch(transactions::update_transaction)
                .delete(transactions::delete_transaction),
        )
        .route(
            "/transactions/{transaction_id}/sync",
            post(transactions::sync_transaction),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    // Mixed routes; handlers pick their own extractor
    let v1_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/users", get(users::list_users).post(users::register_user))
        .route(
            "/users/{user_id}",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/properties",
            get(properties::list_properties).post(properties::create_property),
        )
        .route(
            "/properties/{property_id}",
            get(properties::get_property)
                .patch(properties::update_property)
                .delete(properties::delete_property),
        )
        .merge(session_routes)
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state.clone());

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(middleware::from_fn(request_logger))
                .layer(middleware::from_fn(security_headers))
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn_with_state(state, rate_limit)),
        )
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{header::CONTENT_TYPE, Method, Request},
        response::Response,
        Router,
    };

    use super::router;
    use crate::auth::wallet::tests::TEST_ADDRESS;
    use crate::auth::{IdentityClaims, Role};
    use crate::state::{tests::test_state, AppState};
    use crate::storage::{User, UserRepository};

    pub(crate) fn test_app() -> (Router, AppState, tempfile::TempDir) {
        let (state, dir) = test_state();
        (router(state.clone()), state, dir)
    }

    pub(crate) fn seed_user(state: &AppState, email: &str, role: Role) -> User {
        let user = User::new(email, "Test User", "$argon2id$v=19$stub", role, None);
        UserRepository::new(&state.db).create(&user).unwrap();
        user
    }

    /// Session token for `email`, as if issued by a successful login.
    pub(crate) fn session_token(state: &AppState, email: &str) -> String {
        let identity = IdentityClaims {
            user_id: format!("google-{email}"),
            email: email.to_string(),
            name: None,
        };
        state
            .auth
            .issue_session(&identity, TEST_ADDRESS, Duration::from_secs(600))
            .unwrap()
            .token
    }

    pub(crate) fn request(
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        match body {
            Some(json) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    pub(crate) async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::{header::RETRY_AFTER, Method, StatusCode};
    use tower::ServiceExt;

    use super::test_support::{body_json, request, test_app};
    use super::*;
    use crate::config::RateLimitSettings;
    use crate::middleware::security_headers::SECURITY_HEADERS;
    use crate::state::tests::test_state_with_limit;

    #[tokio::test]
    async fn health_endpoints_report_ok() {
        let (app, _state, _dir) = test_app();
        for path in ["/health", "/health/ready"] {
            let response = app
                .clone()
                .oneshot(request(Method::GET, path, None, None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let json = body_json(response).await;
            assert_eq!(json["status"], "ok");
            assert_eq!(json["checks"]["database"], "ok");
            assert_eq!(json["checks"]["chain"], "disabled");
        }

        let response = app
            .oneshot(request(Method::GET, "/health/live", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn every_response_carries_security_headers_and_request_id() {
        let (app, _state, _dir) = test_app();
        for path in ["/health/live", "/v1/users/me", "/nope"] {
            let response = app
                .clone()
                .oneshot(request(Method::GET, path, None, None))
                .await
                .unwrap();
            for (name, value) in SECURITY_HEADERS {
                assert_eq!(response.headers().get(name).unwrap(), value, "{path} {name}");
            }
            assert!(response.headers().contains_key("x-request-id"));
        }
    }

    #[tokio::test]
    async fn session_routes_reject_missing_token() {
        let (app, _state, _dir) = test_app();
        for path in ["/v1/rental-agreements", "/v1/transactions", "/v1/users/me"] {
            let response = app
                .clone()
                .oneshot(request(Method::GET, path, None, None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{path}");
            assert_eq!(body_json(response).await["error_code"], "missing_auth_header");
        }
    }

    #[tokio::test]
    async fn rate_limit_returns_429_with_retry_after() {
        let (state, _dir) = test_state_with_limit(RateLimitSettings {
            max_requests: 3,
            window: Duration::from_secs(60),
        });
        let app = router(state);

        let mut statuses = Vec::new();
        let mut last = None;
        for _ in 0..4 {
            let response = app
                .clone()
                .oneshot(request(Method::GET, "/health/live", None, None))
                .await
                .unwrap();
            statuses.push(response.status());
            last = Some(response);
        }
        assert_eq!(
            statuses,
            vec![StatusCode::OK, StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]
        );

        let limited = last.unwrap();
        let retry_after: u64 = limited.headers()[RETRY_AFTER].to_str().unwrap().parse().unwrap();
        assert!((1..=60).contains(&retry_after));
        assert!(limited.headers().contains_key("x-content-type-options"));
        assert_eq!(body_json(limited).await["error_code"], "rate_limited");
    }
}
