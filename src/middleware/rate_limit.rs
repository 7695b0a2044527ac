// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-client request rate limiting.
//!
//! Each client key keeps the instants of its requests inside the current
//! window. A request is admitted while fewer than `max_requests` instants
//! remain after pruning, and rejected with `429 Too Many Requests` and a
//! `Retry-After` header otherwise.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::RateLimitSettings;
use crate::error::ApiError;
use crate::state::AppState;

/// Key used when the client address cannot be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// In-memory rate limiter keyed by client.
#[derive(Debug)]
pub struct RateLimiter {
    settings: RateLimitSettings,
    requests: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            settings,
            requests: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> RateLimitSettings {
        self.settings
    }

    /// Admit or reject a request from `key` arriving at `now`.
    ///
    /// Pruning, the limit comparison and the append happen under one lock,
    /// so concurrent callers for the same key never both take the last slot.
    pub fn check_and_record(&self, key: &str, now: Instant) -> bool {
        let mut requests = match self.requests.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let log = requests.entry(key.to_string()).or_default();
        prune(log, now, self.settings.window);

        if log.len() >= self.settings.max_requests {
            return false;
        }
        log.push_back(now);
        true
    }

    /// Time until `key` regains a slot, rounded up to whole seconds (at least 1).
    pub fn retry_after(&self, key: &str, now: Instant) -> u64 {
        let requests = match self.requests.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let wait = requests
            .get(key)
            .and_then(|log| log.front())
            .map(|oldest| (*oldest + self.settings.window).saturating_duration_since(now))
            .unwrap_or(self.settings.window);

        let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
        secs.max(1)
    }

    /// Drop keys with no request inside the window. Returns how many were removed.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let mut requests = match self.requests.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = requests.len();
        requests.retain(|_, log| {
            prune(log, now, self.settings.window);
            !log.is_empty()
        });
        before - requests.len()
    }

    /// Number of tracked client keys.
    pub fn tracked_clients(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Spawn the idle-key eviction loop; it stops when `shutdown` is cancelled.
    pub fn spawn_eviction(self: &Arc<Self>, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::clone(self);
        let period = self.settings.window;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::debug!("Rate limiter eviction stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        let evicted = limiter.evict_idle(Instant::now());
                        if evicted > 0 {
                            tracing::debug!(evicted, "Evicted idle rate limit entries");
                        }
                    }
                }
            }
        })
    }
}

fn prune(log: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = log.front() {
        if now.saturating_duration_since(*oldest) >= window {
            log.pop_front();
        } else {
            break;
        }
    }
}

/// Client key: socket peer, then the first `X-Forwarded-For` entry, then `unknown`.
pub fn client_key(peer: Option<SocketAddr>, headers: &HeaderMap) -> String {
    if let Some(addr) = peer {
        return addr.ip().to_string();
    }
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Axum middleware enforcing the shared [`RateLimiter`].
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(peer, request.headers());
    let now = Instant::now();

    if state.rate_limiter.check_and_record(&key, now) {
        return next.run(request).await;
    }

    let retry_after = state.rate_limiter.retry_after(&key, now);
    tracing::warn!(client = %key, retry_after, "Rate limit exceeded");

    let mut response = ApiError::new(
        StatusCode::TOO_MANY_REQUESTS,
        "rate_limited",
        "Too many requests",
    )
    .into_response();
    response
        .headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from(retry_after));
    response
}
