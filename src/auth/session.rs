// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token minting and verification.
//!
//! Sessions are HMAC-signed JWTs carrying [`SessionClaims`]. Expiry is
//! enforced without leeway.

use std::time::Duration;

use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;

use super::claims::{IdentityClaims, SessionClaims};
use super::error::AuthError;

/// A freshly issued session token.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    pub token: String,
    /// Lifetime in seconds
    pub expires_in: u64,
    /// Claims signed into `token`
    #[serde(skip)]
    pub claims: SessionClaims,
}

/// Issues and verifies session tokens with a server-held secret.
#[derive(Clone)]
pub struct SessionManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create a manager for an HMAC algorithm (HS256, HS384 or HS512).
    pub fn new(secret: &[u8], algorithm: Algorithm) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm,
        }
    }

    /// Issue a session valid for `ttl` from now.
    pub fn issue(
        &self,
        identity: &IdentityClaims,
        wallet_address: &str,
        ttl: Duration,
    ) -> Result<IssuedSession, AuthError> {
        self.issue_at(identity, wallet_address, ttl, chrono::Utc::now().timestamp())
    }

    /// Issue a session as if the current time were `now` (Unix seconds).
    pub fn issue_at(
        &self,
        identity: &IdentityClaims,
        wallet_address: &str,
        ttl: Duration,
        now: i64,
    ) -> Result<IssuedSession, AuthError> {
        let ttl_secs = ttl.as_secs();
        let exp = i64::try_from(ttl_secs)
            .ok()
            .and_then(|secs| now.checked_add(secs))
            .ok_or_else(|| AuthError::Internal(format!("session ttl of {ttl_secs}s is out of range")))?;
        let claims = SessionClaims {
            user_id: identity.user_id.clone(),
            email: identity.email.clone(),
            wallet_address: wallet_address.to_string(),
            iat: now,
            exp,
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("failed to sign session: {e}")))?;

        Ok(IssuedSession {
            token,
            expires_in: ttl_secs,
            claims,
        })
    }

    /// Verify a session token's signature and expiry.
    ///
    /// A token past its `exp` is reported as [`AuthError::SessionExpired`]
    /// even when its signature does not verify; it is rejected either way.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::SessionExpired,
                ErrorKind::InvalidSignature if self.is_past_expiry(token) => {
                    AuthError::SessionExpired
                }
                ErrorKind::InvalidSignature => {
                    AuthError::SessionInvalid("signature mismatch".to_string())
                }
                _ => AuthError::SessionInvalid(e.to_string()),
            })
    }

    /// Read `exp` without trusting the signature.
    fn is_past_expiry(&self, token: &str) -> bool {
        let mut validation = Validation::new(self.algorithm);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims.exp < chrono::Utc::now().timestamp())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn identity() -> IdentityClaims {
        IdentityClaims {
            user_id: "google-sub-1".to_string(),
            email: "alice@example.com".to_string(),
            name: Some("Alice".to_string()),
        }
    }

    #[test]
    fn issued_token_round_trips() {
        let manager = SessionManager::new(SECRET, Algorithm::HS256);
        let wallet = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";
        let issued = manager
            .issue(&identity(), wallet, Duration::from_secs(1800))
            .unwrap();
        assert_eq!(issued.expires_in, 1800);

        let claims = manager.verify(&issued.token).unwrap();
        assert_eq!(claims.user_id, "google-sub-1");
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.wallet_address, wallet);
        assert_eq!(claims.exp, claims.iat + 1800);
        assert_eq!(claims, issued.claims);
    }

    #[test]
    fn expired_token_is_session_expired() {
        let manager = SessionManager::new(SECRET, Algorithm::HS256);
        let now = chrono::Utc::now().timestamp();
        let issued = manager
            .issue_at(&identity(), "0xabc", Duration::from_secs(60), now - 3600)
            .unwrap();
        assert_eq!(manager.verify(&issued.token), Err(AuthError::SessionExpired));
    }

    #[test]
    fn tampered_signature_is_session_invalid() {
        let manager = SessionManager::new(SECRET, Algorithm::HS256);
        let issued = manager
            .issue(&identity(), "0xabc", Duration::from_secs(60))
            .unwrap();

        let (body, sig) = issued.token.rsplit_once('.').unwrap();
        let first = sig.chars().next().unwrap();
        let swapped = if first == 'A' { 'B' } else { 'A' };
        let tampered = format!("{body}.{swapped}{}", &sig[1..]);

        assert!(matches!(
            manager.verify(&tampered),
            Err(AuthError::SessionInvalid(_))
        ));
    }

    #[test]
    fn expired_token_is_expired_regardless_of_signature() {
        let manager = SessionManager::new(SECRET, Algorithm::HS256);
        let other = SessionManager::new(b"another-secret-another-secret-xx", Algorithm::HS256);
        let now = chrono::Utc::now().timestamp();
        let expired = other
            .issue_at(&identity(), "0xabc", Duration::from_secs(60), now - 3600)
            .unwrap();
        assert_eq!(manager.verify(&expired.token), Err(AuthError::SessionExpired));

        let live = other
            .issue(&identity(), "0xabc", Duration::from_secs(60))
            .unwrap();
        assert!(matches!(
            manager.verify(&live.token),
            Err(AuthError::SessionInvalid(_))
        ));
    }

    #[test]
    fn out_of_range_ttl_is_an_error() {
        let manager = SessionManager::new(SECRET, Algorithm::HS256);
        assert!(matches!(
            manager.issue(&identity(), "0xabc", Duration::from_secs(u64::MAX)),
            Err(AuthError::Internal(_))
        ));
        assert!(matches!(
            manager.issue_at(&identity(), "0xabc", Duration::from_secs(i64::MAX as u64), 10),
            Err(AuthError::Internal(_))
        ));
    }

    #[test]
    fn garbage_and_algorithm_mismatch_are_invalid() {
        let hs256 = SessionManager::new(SECRET, Algorithm::HS256);
        let hs512 = SessionManager::new(SECRET, Algorithm::HS512);
        assert!(matches!(hs256.verify("a.b.c"), Err(AuthError::SessionInvalid(_))));

        let issued = hs512
            .issue(&identity(), "0xabc", Duration::from_secs(60))
            .unwrap();
        assert!(matches!(hs256.verify(&issued.token), Err(AuthError::SessionInvalid(_))));
        assert!(hs512.verify(&issued.token).is_ok());
    }
}
