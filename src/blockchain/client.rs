// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EVM JSON-RPC client for transaction confirmation lookups.

use alloy::{
    network::Ethereum,
    primitives::TxHash,
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
};

/// HTTP provider type (with the default fillers).
type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

/// On-chain state of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainConfirmation {
    pub block_number: u64,
    /// Blocks on top of (and including) the inclusion block
    pub confirmations: i64,
    /// Receipt status (false when reverted)
    pub success: bool,
}

/// Read-only chain client.
pub struct ChainClient {
    rpc_url: String,
    provider: HttpProvider,
}

impl ChainClient {
    /// Create a client for the given JSON-RPC endpoint. No request is made.
    pub fn new(rpc_url: &str) -> Result<Self, ChainError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainError::InvalidRpcUrl(e.to_string()))?;

        let provider = ProviderBuilder::new().connect_http(url);

        Ok(Self {
            rpc_url: rpc_url.to_string(),
            provider,
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Get the current block number.
    pub async fn get_block_number(&self) -> Result<u64, ChainError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    /// Look up a transaction's receipt and confirmation depth.
    ///
    /// Returns `None` while the transaction is not yet mined.
    pub async fn confirmations(&self, tx_hash: &str) -> Result<Option<ChainConfirmation>, ChainError> {
        let hash: TxHash = tx_hash
            .parse()
            .map_err(|e| ChainError::InvalidHash(format!("{tx_hash}: {e}")))?;

        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| ChainError::Rpc(format!("Failed to get receipt: {e}")))?;

        let Some(receipt) = receipt else {
            return Ok(None);
        };
        let Some(block_number) = receipt.block_number else {
            return Ok(None);
        };

        let head = self.get_block_number().await?;
        Ok(Some(ChainConfirmation {
            block_number,
            confirmations: confirmations_from(head, block_number),
            success: receipt.status(),
        }))
    }
}

/// Confirmation depth of a transaction mined in `block` when the chain head is `head`.
pub fn confirmations_from(head: u64, block: u64) -> i64 {
    if head < block {
        0
    } else {
        (head - block + 1) as i64
    }
}

/// Errors that can occur during chain lookups.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid transaction hash: {0}")]
    InvalidHash(String),

    #[error("RPC error: {0}")]
    Rpc(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_depth() {
        assert_eq!(confirmations_from(100, 100), 1);
        assert_eq!(confirmations_from(111, 100), 12);
        // Lagging node
        assert_eq!(confirmations_from(99, 100), 0);
    }

    #[test]
    fn rejects_invalid_rpc_url() {
        assert!(matches!(
            ChainClient::new("not a url"),
            Err(ChainError::InvalidRpcUrl(_))
        ));
        let client = ChainClient::new("http://127.0.0.1:8545").unwrap();
        assert_eq!(client.rpc_url(), "http://127.0.0.1:8545");
    }

    #[tokio::test]
    async fn malformed_hash_fails_before_any_request() {
        let client = ChainClient::new("http://127.0.0.1:1").unwrap();
        assert!(matches!(
            client.confirmations("0x1234").await,
            Err(ChainError::InvalidHash(_))
        ));
    }
}
