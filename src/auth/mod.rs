// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Multi-factor login for the Rental Registry API.
//!
//! ## Auth Flow
//!
//! 1. Frontend signs the user in with Google and obtains an ID token
//! 2. Frontend asks the user's wallet to `personal_sign` a login message
//! 3. `POST /v1/auth/login` with both proofs:
//!    - ID token verified against Google's JWKS (audience, issuer, expiry)
//!    - Signature recovered (EIP-191) and compared to the claimed address
//! 4. Server returns a session JWT, sent as `Authorization: Bearer <token>`
//!
//! ## Security
//!
//! - JWKS fetched over HTTPS and cached with TTL
//! - Identity tokens tolerate 60 seconds of clock skew; sessions do not
//! - Sessions are signed with an HMAC secret of at least 32 bytes

pub mod claims;
pub mod error;
pub mod extractor;
pub mod identity;
pub mod jwks;
pub mod middleware;
pub mod roles;
pub mod service;
pub mod session;
pub mod wallet;

pub use claims::{IdentityClaims, SessionClaims};
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth, CurrentUser};
pub use identity::{GoogleIdentityVerifier, IdentityVerifier};
pub use jwks::JwksManager;
pub use middleware::require_session;
pub use roles::Role;
pub use service::AuthService;
pub use session::{IssuedSession, SessionManager};
pub use wallet::{EthereumWalletVerifier, WalletVerification, WalletVerifier};
