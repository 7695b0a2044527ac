// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

/// Request id header, set upstream by `SetRequestIdLayer`.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Log each request with its method, path, status and latency.
pub async fn request_logger(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let latency_ms = start.elapsed().as_millis() as u64;
    if status.is_server_error() {
        tracing::error!(request_id = %request_id, method = %method, path = %path, status = status.as_u16(), latency_ms, "Request failed");
    } else {
        tracing::info!(request_id = %request_id, method = %method, path = %path, status = status.as_u16(), latency_ms, "Request completed");
    }
    response
}
