// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Multi-factor login: identity token AND wallet signature, then a session.
//!
//! ## Pipeline
//!
//! 1. Verify the identity-provider token ([`IdentityVerifier`])
//! 2. Verify the wallet signature ([`WalletVerifier`])
//! 3. Issue a session token ([`SessionManager`])
//!
//! The first failing step ends the pipeline; later steps are never run.

use std::sync::Arc;
use std::time::Duration;

use super::claims::{IdentityClaims, SessionClaims};
use super::error::AuthError;
use super::identity::{GoogleIdentityVerifier, IdentityVerifier};
use super::jwks::{JwksError, JwksManager};
use super::session::{IssuedSession, SessionManager};
use super::wallet::{EthereumWalletVerifier, WalletVerification, WalletVerifier};
use crate::config::AuthSettings;

/// Authentication service shared by all handlers.
#[derive(Clone)]
pub struct AuthService {
    identity: Arc<dyn IdentityVerifier>,
    wallet: Arc<dyn WalletVerifier>,
    sessions: SessionManager,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(
        identity: Arc<dyn IdentityVerifier>,
        wallet: Arc<dyn WalletVerifier>,
        settings: &AuthSettings,
    ) -> Self {
        Self {
            identity,
            wallet,
            sessions: SessionManager::new(settings.jwt_secret.as_bytes(), settings.jwt_algorithm),
            token_ttl: settings.token_ttl,
        }
    }

    /// Production wiring: Google ID tokens and Ethereum signatures.
    pub fn from_settings(settings: &AuthSettings) -> Result<Self, JwksError> {
        let google = GoogleIdentityVerifier::new(&settings.google_client_id, JwksManager::google()?);
        Ok(Self::new(
            Arc::new(google),
            Arc::new(EthereumWalletVerifier),
            settings,
        ))
    }

    /// Configured session lifetime.
    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    pub async fn verify_identity_token(&self, token: &str) -> Result<IdentityClaims, AuthError> {
        self.identity.verify(token).await
    }

    pub fn verify_wallet_signature(
        &self,
        address: &str,
        signature: &str,
        message: &str,
    ) -> WalletVerification {
        self.wallet.verify(address, signature, message)
    }

    pub fn issue_session(
        &self,
        identity: &IdentityClaims,
        wallet_address: &str,
        ttl: Duration,
    ) -> Result<IssuedSession, AuthError> {
        self.sessions.issue(identity, wallet_address, ttl)
    }

    pub fn verify_session(&self, token: &str) -> Result<SessionClaims, AuthError> {
        self.sessions.verify(token)
    }

    /// Run the full login pipeline with the configured session lifetime.
    pub async fn authenticate(
        &self,
        identity_token: &str,
        wallet_address: &str,
        wallet_signature: &str,
        message: &str,
    ) -> Result<IssuedSession, AuthError> {
        let identity = self.verify_identity_token(identity_token).await?;

        let proof = self.verify_wallet_signature(wallet_address, wallet_signature, message);
        if !proof.valid {
            tracing::warn!(
                user_id = %identity.user_id,
                wallet = %proof.address,
                "Wallet signature rejected"
            );
            return Err(AuthError::InvalidSignature(
                "signature does not match wallet address".to_string(),
            ));
        }

        let session = self.issue_session(&identity, &proof.address, self.token_ttl)?;
        tracing::info!(user_id = %identity.user_id, "Session issued");
        Ok(session)
    }

    /// Whether the identity verifier can reach its key material.
    pub async fn is_ready(&self) -> bool {
        self.identity.is_ready().await
    }
}
