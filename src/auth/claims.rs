// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity-provider and session claims.

use serde::{Deserialize, Serialize};

/// Claims carried by a Google ID token.
///
/// See: https://developers.google.com/identity/openid-connect/openid-connect#an-id-tokens-payload
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleClaims {
    /// Subject (stable Google account ID)
    pub sub: String,

    /// Issuer (`accounts.google.com` or `https://accounts.google.com`)
    pub iss: String,

    /// Expiration timestamp
    pub exp: i64,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub email_verified: Option<bool>,

    /// Display name
    #[serde(default)]
    pub name: Option<String>,
}

/// Verified identity returned by an identity verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Subject ID at the identity provider
    pub user_id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl IdentityClaims {
    /// Build from verified Google claims; `None` when the token carries no email.
    pub fn from_google(claims: GoogleClaims) -> Option<Self> {
        let email = claims.email?;
        Some(Self {
            user_id: claims.sub,
            email,
            name: claims.name,
        })
    }
}

/// Claims embedded in an issued session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Identity-provider subject ID
    pub user_id: String,
    pub email: String,
    /// Wallet address proven at login
    pub wallet_address: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiry (Unix seconds), always `iat + ttl`
    pub exp: i64,
}
