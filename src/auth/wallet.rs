// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ethereum wallet signature verification (EIP-191 `personal_sign`).
//!
//! ## Procedure
//!
//! 1. Hash `"\x19Ethereum Signed Message:\n" + len(message) + message` with keccak256
//! 2. Split the 65-byte signature into `r || s || v` (`v` in {0, 1, 27, 28})
//! 3. Normalize high-S signatures, flipping the recovery id
//! 4. Recover the secp256k1 public key and derive its address
//! 5. Compare to the claimed address, case-insensitively

use alloy::primitives::keccak256;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use serde::Serialize;

use crate::storage::constraints::is_wallet_address;

/// Why a signature could not be checked.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature is not valid hex")]
    Encoding,

    #[error("signature must be 65 bytes, got {0}")]
    Length(usize),

    #[error("unsupported recovery byte {0}")]
    RecoveryByte(u8),

    #[error("signature scalars are out of range")]
    Malformed,

    #[error("public key recovery failed")]
    Recovery,
}

/// Outcome of a wallet proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletVerification {
    pub valid: bool,
    /// The address the caller claimed
    pub address: String,
}

/// Checks that a message was signed by the key behind an address.
pub trait WalletVerifier: Send + Sync {
    fn verify(&self, address: &str, signature: &str, message: &str) -> WalletVerification;
}

/// EIP-191 signature recovery for Ethereum addresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct EthereumWalletVerifier;

impl WalletVerifier for EthereumWalletVerifier {
    fn verify(&self, address: &str, signature: &str, message: &str) -> WalletVerification {
        let valid = if !is_wallet_address(address) {
            tracing::debug!(address, "Wallet address is malformed");
            false
        } else {
            match recover_address(message, signature) {
                Ok(recovered) => recovered.eq_ignore_ascii_case(address),
                Err(e) => {
                    tracing::debug!(error = %e, "Wallet signature could not be recovered");
                    false
                }
            }
        };
        WalletVerification {
            valid,
            address: address.to_string(),
        }
    }
}

/// EIP-191 digest of a `personal_sign` message.
pub fn eip191_hash(message: &str) -> [u8; 32] {
    let prefixed = format!("\x19Ethereum Signed Message:\n{}{}", message.len(), message);
    keccak256(prefixed.as_bytes()).0
}

/// Recover the lowercase `0x` address that signed `message`.
pub fn recover_address(message: &str, signature: &str) -> Result<String, SignatureError> {
    let hex = signature.strip_prefix("0x").unwrap_or(signature);
    let bytes = alloy::hex::decode(hex).map_err(|_| SignatureError::Encoding)?;
    if bytes.len() != 65 {
        return Err(SignatureError::Length(bytes.len()));
    }

    let v = bytes[64];
    let recovery_byte = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        other => return Err(SignatureError::RecoveryByte(other)),
    };

    let mut sig = Signature::from_slice(&bytes[..64]).map_err(|_| SignatureError::Malformed)?;
    let mut recovery_id =
        RecoveryId::from_byte(recovery_byte).ok_or(SignatureError::RecoveryByte(v))?;
    if let Some(normalized) = sig.normalize_s() {
        sig = normalized;
        recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
    }

    let digest = eip191_hash(message);
    let key = VerifyingKey::recover_from_prehash(&digest, &sig, recovery_id)
        .map_err(|_| SignatureError::Recovery)?;
    Ok(address_of(&key))
}

/// Ethereum address of a public key: last 20 bytes of keccak256(x || y).
fn address_of(key: &VerifyingKey) -> String {
    let uncompressed = key.to_encoded_point(false);
    let hash = keccak256(&uncompressed.as_bytes()[1..]);
    format!("0x{}", alloy::hex::encode(&hash[12..]))
}
