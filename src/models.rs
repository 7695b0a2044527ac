// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies for the REST API. Stored entities
//! ([`Property`](crate::storage::Property),
//! [`RentalAgreement`](crate::storage::RentalAgreement),
//! [`Transaction`](crate::storage::Transaction)) are returned as-is; users go
//! through [`UserResponse`] so the password hash never leaves the server.
//!
//! Update requests use `Option` fields: absent means "leave unchanged".

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::storage::{AgreementStatus, PropertyStatus, TxKind, TxStatus, User};

/// Minimum accepted password length on registration.
pub const MIN_PASSWORD_LEN: usize = 8;

// =============================================================================
// Auth Models
// =============================================================================

/// Login with both factors.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    /// Google ID token
    pub id_token: String,
    pub wallet_address: String,
    /// `personal_sign` signature over `message`
    pub signature: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always `"bearer"`
    pub token_type: String,
    /// Seconds until expiry
    pub expires_in: u64,
}

impl TokenResponse {
    pub fn bearer(access_token: String, expires_in: u64) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
            expires_in,
        }
    }
}

/// Confirmation returned by DELETE endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub message: String,
    pub id: String,
}

impl DeletedResponse {
    pub fn new(resource: &str, id: String) -> Self {
        Self {
            message: format!("{resource} deleted successfully"),
            id,
        }
    }
}

// =============================================================================
// User Models
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUserRequest {
    pub email: String,
    pub full_name: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub wallet_address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
    /// Admin only
    pub role: Option<Role>,
    pub wallet_address: Option<String>,
    /// Admin only
    pub is_active: Option<bool>,
    /// Admin only
    pub is_verified: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserQuery {
    pub role: Option<Role>,
}

/// Public view of a user account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            wallet_address: user.wallet_address,
            is_active: user.is_active,
            is_verified: user.is_verified,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

// =============================================================================
// Property Models
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePropertyRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub area: f64,
    #[serde(default)]
    pub amenities: Option<serde_json::Value>,
    #[serde(default)]
    pub images: Option<serde_json::Value>,
    #[serde(default)]
    pub address: Option<serde_json::Value>,
    #[serde(default)]
    pub blockchain_id: Option<String>,
    #[serde(default)]
    pub metadata_uri: Option<String>,
    #[serde(default)]
    pub status: Option<PropertyStatus>,
    /// Admins may list on behalf of another user
    #[serde(default)]
    pub owner_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePropertyRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub area: Option<f64>,
    pub amenities: Option<serde_json::Value>,
    pub images: Option<serde_json::Value>,
    pub address: Option<serde_json::Value>,
    pub blockchain_id: Option<String>,
    pub metadata_uri: Option<String>,
    pub status: Option<PropertyStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyQuery {
    pub owner_id: Option<String>,
    pub status: Option<PropertyStatus>,
}

// =============================================================================
// Rental Agreement Models
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAgreementRequest {
    pub property_id: String,
    /// Defaults to the caller
    #[serde(default)]
    pub tenant_id: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monthly_rent: f64,
    #[serde(default)]
    pub security_deposit: f64,
    #[serde(default)]
    pub agreement_hash: Option<String>,
    #[serde(default)]
    pub blockchain_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAgreementRequest {
    pub status: Option<AgreementStatus>,
    pub agreement_hash: Option<String>,
    pub blockchain_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgreementQuery {
    pub property_id: Option<String>,
    pub tenant_id: Option<String>,
}

// =============================================================================
// Transaction Models
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTransactionRequest {
    #[serde(default)]
    pub property_id: Option<String>,
    #[serde(default)]
    pub kind: Option<TxKind>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub from_address: Option<String>,
    #[serde(default)]
    pub to_address: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTransactionRequest {
    pub property_id: Option<String>,
    pub kind: Option<TxKind>,
    pub amount: Option<f64>,
    pub status: Option<TxStatus>,
    pub hash: Option<String>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub confirmations: Option<i64>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionQuery {
    pub property_id: Option<String>,
}
