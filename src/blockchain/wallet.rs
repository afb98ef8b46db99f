//! Account wallet: the persistent ledger identity that pays for and is
//! authorized to send verification transactions.
//!
//! # Security
//! - Keys come from configuration or `VERIFIER_ACCOUNT_PRIVATE_KEY`
//! - Keys are never logged or serialized

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Wallet for transaction signing with nonce tracking.
pub struct AccountWallet {
    /// The underlying signer (private key).
    signer: PrivateKeySigner,
    /// Network wallet used to sign transaction requests.
    network_wallet: EthereumWallet,
    /// Next nonce this process expects to use.
    nonce: Arc<AtomicU64>,
    /// Chain ID for EIP-155 replay protection.
    chain_id: u64,
}

impl AccountWallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    /// * `chain_id` - Chain ID for transaction signing
    pub fn from_private_key(private_key_hex: &str, chain_id: u64) -> BlockchainResult<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))?;

        tracing::info!(
            address = %signer.address(),
            chain_id = chain_id,
            "Account wallet initialized"
        );

        Ok(Self {
            network_wallet: EthereumWallet::from(signer.clone()),
            signer,
            nonce: Arc::new(AtomicU64::new(0)),
            chain_id,
        })
    }

    /// Get the wallet's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Get the chain ID this wallet is configured for.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Reconcile the local nonce with the chain's transaction count.
    ///
    /// Returns the nonce to use next: the chain's count, unless this process
    /// already used nonces the node has not reported yet.
    pub fn sync_nonce(&self, chain_count: u64) -> u64 {
        let previous = self.nonce.fetch_max(chain_count, Ordering::SeqCst);
        previous.max(chain_count)
    }

    /// Forget local nonce state and adopt the chain's count.
    pub fn reset_nonce(&self, chain_count: u64) {
        self.nonce.store(chain_count, Ordering::SeqCst);
    }

    /// Record that `nonce` has been consumed by a broadcast transaction.
    pub fn mark_used(&self, nonce: u64) {
        self.nonce.fetch_max(nonce + 1, Ordering::SeqCst);
    }

    /// Get current nonce without changing it.
    pub fn current_nonce(&self) -> u64 {
        self.nonce.load(Ordering::SeqCst)
    }

    /// Sign a complete transaction request, returning its EIP-2718 encoding.
    pub async fn sign_transaction(&self, tx: TransactionRequest) -> BlockchainResult<Bytes> {
        let envelope = tx
            .with_from(self.address())
            .with_chain_id(self.chain_id)
            .build(&self.network_wallet)
            .await
            .map_err(|e| BlockchainError::Wallet(format!("Transaction signing failed: {}", e)))?;

        Ok(Bytes::from(envelope.encoded_2718()))
    }
}

impl Clone for AccountWallet {
    fn clone(&self) -> Self {
        Self {
            signer: self.signer.clone(),
            network_wallet: self.network_wallet.clone(),
            nonce: self.nonce.clone(),
            chain_id: self.chain_id,
        }
    }
}

impl std::fmt::Debug for AccountWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountWallet")
            .field("address", &self.address())
            .field("chain_id", &self.chain_id)
            .field("nonce", &self.current_nonce())
            .finish()
    }
}
