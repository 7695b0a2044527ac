// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity-provider token verification.
//!
//! The login pipeline only depends on the [`IdentityVerifier`] trait. The
//! production implementation verifies Google ID tokens against Google's
//! JWKS, bound to the configured OAuth client ID.

use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, errors::ErrorKind, Validation};

use super::claims::{GoogleClaims, IdentityClaims};
use super::error::AuthError;
use super::jwks::JwksManager;

/// Issuers Google uses for ID tokens.
pub const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Clock skew tolerance for identity tokens (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Upper bound on one identity-provider round trip.
pub const IDENTITY_TIMEOUT: Duration = Duration::from_secs(10);

/// Verifies a bearer token issued by an external identity provider.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify `token`, returning the identity it asserts.
    ///
    /// Every failure is reported as [`AuthError::InvalidToken`].
    async fn verify(&self, token: &str) -> Result<IdentityClaims, AuthError>;

    /// Whether the verifier can currently reach its key material.
    async fn is_ready(&self) -> bool {
        true
    }
}

/// Google ID token verifier.
#[derive(Clone)]
pub struct GoogleIdentityVerifier {
    client_id: String,
    jwks: JwksManager,
    timeout: Duration,
}

impl GoogleIdentityVerifier {
    pub fn new(client_id: impl Into<String>, jwks: JwksManager) -> Self {
        Self {
            client_id: client_id.into(),
            jwks,
            timeout: IDENTITY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn verify_inner(&self, token: &str) -> Result<IdentityClaims, AuthError> {
        let header = decode_header(token)
            .map_err(|e| invalid_token("malformed token header", &e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| invalid_token("token header has no key id", "kid missing"))?;

        let (decoding_key, algorithm) = self
            .jwks
            .get_decoding_key(&kid)
            .await
            .map_err(|e| invalid_token("signing key unavailable", &e.to_string()))?;

        let mut validation = Validation::new(algorithm);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.set_audience(&[&self.client_id]);
        validation.set_issuer(&GOOGLE_ISSUERS);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        let token_data =
            decode::<GoogleClaims>(token, &decoding_key, &validation).map_err(|e| {
                let reason = match e.kind() {
                    ErrorKind::ExpiredSignature => "token has expired",
                    ErrorKind::InvalidAudience => "token audience mismatch",
                    ErrorKind::InvalidIssuer => "token issuer mismatch",
                    ErrorKind::InvalidSignature => "token signature is invalid",
                    _ => "token is malformed",
                };
                invalid_token(reason, &e.to_string())
            })?;

        let claims = token_data.claims;
        if claims.email_verified == Some(false) {
            return Err(invalid_token("email is not verified", &claims.sub));
        }
        IdentityClaims::from_google(claims)
            .ok_or_else(|| invalid_token("token carries no email", "email missing"))
    }
}

#[async_trait]
impl IdentityVerifier for GoogleIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<IdentityClaims, AuthError> {
        match tokio::time::timeout(self.timeout, self.verify_inner(token)).await {
            Ok(result) => result,
            Err(_) => Err(invalid_token(
                "identity provider timed out",
                &format!("{:?}", self.timeout),
            )),
        }
    }

    async fn is_ready(&self) -> bool {
        self.jwks.is_cached().await || self.jwks.refresh().await.is_ok()
    }
}

fn invalid_token(reason: &str, cause: &str) -> AuthError {
    tracing::warn!(reason, cause, "Identity token rejected");
    AuthError::InvalidToken(reason.to_string())
}
