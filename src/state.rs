// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::AuthService;
use crate::blockchain::ChainClient;
use crate::config::RateLimitSettings;
use crate::middleware::RateLimiter;
use crate::storage::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub auth: Arc<AuthService>,
    pub rate_limiter: Arc<RateLimiter>,
    /// Present when `RPC_URL` is configured
    pub chain: Option<Arc<ChainClient>>,
}

impl AppState {
    pub fn new(db: Database, auth: AuthService, rate_limit: RateLimitSettings) -> Self {
        Self {
            db: Arc::new(db),
            auth: Arc::new(auth),
            rate_limiter: Arc::new(RateLimiter::new(rate_limit)),
            chain: None,
        }
    }

    pub fn with_chain(mut self, chain: ChainClient) -> Self {
        self.chain = Some(Arc::new(chain));
        self
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use super::*;
    use crate::auth::service::tests::test_service;

    /// State backed by a fresh database in a temp directory.
    pub(crate) fn test_state() -> (AppState, tempfile::TempDir) {
        test_state_with_limit(RateLimitSettings::default())
    }

    pub(crate) fn test_state_with_limit(limit: RateLimitSettings) -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.redb")).unwrap();
        let state = AppState::new(db, test_service("alice@example.com"), limit);
        (state, dir)
    }

    #[test]
    fn chain_is_optional() {
        let (state, _dir) = test_state();
        assert!(state.chain.is_none());
        let state = state.with_chain(ChainClient::new("http://127.0.0.1:8545").unwrap());
        assert!(state.chain.is_some());
        assert_eq!(state.rate_limiter.settings().window, Duration::from_secs(60));
    }
}
