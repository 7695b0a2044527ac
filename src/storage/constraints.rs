// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Row-level check constraints and constraint violation reporting.
//!
//! Every repository write calls the `validate()` method of the record it is
//! about to store *inside* the write transaction, so a violated check aborts
//! the write before anything is committed.

use unicode_normalization::UnicodeNormalization;

/// A storage-enforced integrity rule that a write would have broken.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstraintViolation {
    /// Another row already holds this value in a unique column.
    #[error("duplicate value for unique column {table}.{column}")]
    Unique {
        table: &'static str,
        column: &'static str,
    },

    /// A row-level predicate (range, shape) does not hold.
    #[error("check constraint {constraint} failed on {table}")]
    Check {
        table: &'static str,
        constraint: &'static str,
    },

    /// A reference points at a row that does not exist.
    #[error("{table}.{column} references a row that does not exist")]
    ForeignKey {
        table: &'static str,
        column: &'static str,
    },
}

impl ConstraintViolation {
    pub fn unique(table: &'static str, column: &'static str) -> Self {
        Self::Unique { table, column }
    }

    pub fn check(table: &'static str, constraint: &'static str) -> Self {
        Self::Check { table, constraint }
    }

    pub fn foreign_key(table: &'static str, column: &'static str) -> Self {
        Self::ForeignKey { table, column }
    }

    /// Short machine-readable tag (`unique`, `check`, `foreign_key`).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unique { .. } => "unique",
            Self::Check { .. } => "check",
            Self::ForeignKey { .. } => "foreign_key",
        }
    }
}

/// Result of a single row validation.
pub type CheckResult = Result<(), ConstraintViolation>;

/// Fail with a check violation unless `predicate` holds.
pub fn ensure(predicate: bool, table: &'static str, constraint: &'static str) -> CheckResult {
    if predicate {
        Ok(())
    } else {
        Err(ConstraintViolation::check(table, constraint))
    }
}

/// Canonical form used for storage and uniqueness of email addresses.
pub fn normalize_email(email: &str) -> String {
    email.trim().nfkc().collect::<String>().to_lowercase()
}

/// Minimal `local@domain.tld` shape check.
pub fn is_email_shape(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.find('.') {
        Some(_) => !domain.starts_with('.') && !domain.ends_with('.'),
        None => false,
    }
}

/// `true` if `value` is `0x` followed by exactly `hex_len` hex digits.
fn is_prefixed_hex(value: &str, hex_len: usize) -> bool {
    value.len() == hex_len + 2
        && value.starts_with("0x")
        && value[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// EVM account address: `0x` + 40 hex digits (42 characters).
pub fn is_wallet_address(value: &str) -> bool {
    is_prefixed_hex(value, 40)
}

/// EVM transaction hash: `0x` + 64 hex digits (66 characters).
pub fn is_transaction_hash(value: &str) -> bool {
    is_prefixed_hex(value, 64)
}

/// Lowercased address used for case-insensitive uniqueness.
pub fn normalize_address(address: &str) -> String {
    address.to_ascii_lowercase()
}

/// Strictly positive, finite amount.
pub fn is_positive_amount(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Zero or positive, finite amount.
pub fn is_non_negative_amount(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_accepts_plain_addresses() {
        assert!(is_email_shape("alice@example.com"));
        assert!(is_email_shape("a.b+tag@mail.example.co"));
    }

    #[test]
    fn email_shape_rejects_malformed_addresses() {
        assert!(!is_email_shape("alice"));
        assert!(!is_email_shape("@example.com"));
        assert!(!is_email_shape("alice@example"));
        assert!(!is_email_shape("alice@.com"));
        assert!(!is_email_shape("alice@example."));
        assert!(!is_email_shape("al ice@example.com"));
        assert!(!is_email_shape("a@b@example.com"));
    }

    #[test]
    fn email_normalization_lowercases_and_trims() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
        // Fullwidth characters fold under NFKC
        assert_eq!(normalize_email("ａlice@example.com"), "alice@example.com");
    }

    #[test]
    fn wallet_address_requires_prefix_and_length() {
        assert!(is_wallet_address("0x2c7536E3605D9C16a7a3D7b1898e529396a65c23"));
        assert!(!is_wallet_address("2c7536E3605D9C16a7a3D7b1898e529396a65c23"));
        assert!(!is_wallet_address("0x2c7536E3605D9C16a7a3D7b1898e529396a65c2"));
        assert!(!is_wallet_address("0xZZ7536E3605D9C16a7a3D7b1898e529396a65c23"));
    }

    #[test]
    fn transaction_hash_is_66_characters() {
        let hash = format!("0x{}", "ab".repeat(32));
        assert_eq!(hash.len(), 66);
        assert!(is_transaction_hash(&hash));
        assert!(!is_transaction_hash(&hash[..65]));
        assert!(!is_transaction_hash(&format!("1x{}", "ab".repeat(32))));
    }

    #[test]
    fn amount_checks() {
        assert!(is_positive_amount(0.01));
        assert!(!is_positive_amount(0.0));
        assert!(!is_positive_amount(f64::NAN));
        assert!(is_non_negative_amount(0.0));
        assert!(!is_non_negative_amount(-1.0));
        assert!(!is_non_negative_amount(f64::INFINITY));
    }

    #[test]
    fn violation_kind_tags() {
        assert_eq!(ConstraintViolation::unique("users", "email").kind(), "unique");
        assert_eq!(
            ConstraintViolation::check("properties", "ck_properties_price").kind(),
            "check"
        );
        assert_eq!(
            ConstraintViolation::foreign_key("properties", "owner_id").kind(),
            "foreign_key"
        );
    }
}
