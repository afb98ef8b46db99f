//! Blockchain RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Connect to JSON-RPC endpoint (primary + failovers)
//! - Query chain state (block number, logs, balances, nonces, receipts)
//! - Broadcast signed transactions and classify node rejections
//! - Handle timeouts and network errors gracefully

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, Log, TransactionReceipt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::ledger::Ledger;
use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainId, LedgerReceipt};
use crate::config::LedgerConfig;
use crate::observability::metrics;

/// Blockchain RPC client wrapper with failover support.
#[derive(Clone)]
pub struct BlockchainClient {
    /// List of providers (primary + failovers).
    providers: Vec<Arc<dyn Provider + Send + Sync>>,
    /// Configuration.
    config: LedgerConfig,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Create a new blockchain client.
    ///
    /// Fails only on an unparseable primary URL; reachability is checked by
    /// the caller through [`BlockchainClient::verify_chain_id`].
    pub fn new(config: LedgerConfig) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        // 1. Add primary provider
        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(Arc::new(ProviderBuilder::new().connect_http(primary_url)) as Arc<dyn Provider + Send + Sync>);

        // 2. Add failover providers
        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse() {
                providers.push(Arc::new(ProviderBuilder::new().connect_http(url)) as Arc<dyn Provider + Send + Sync>);
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        tracing::debug!(
            rpc_url = %config.rpc_url,
            failovers = providers.len() - 1,
            "Blockchain client created"
        );

        Ok(Self {
            providers,
            config,
            timeout_duration,
        })
    }

    /// Verify the connected chain ID matches configuration, if one is configured.
    pub async fn verify_chain_id(&self) -> BlockchainResult<ChainId> {
        let chain_id = self.get_chain_id().await?;
        if let Some(expected) = self.config.chain_id {
            if chain_id.0 != expected {
                return Err(BlockchainError::ChainMismatch {
                    expected,
                    actual: chain_id.0,
                });
            }
        }
        Ok(chain_id)
    }

    /// Get the chain ID from the RPC.
    pub async fn get_chain_id(&self) -> BlockchainResult<ChainId> {
        for (i, provider) in self.providers.iter().enumerate() {
            let fut = provider.get_chain_id();
            match timeout(self.timeout_duration, fut).await {
                Ok(Ok(result)) => return Ok(ChainId(result)),
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, error = %e, "RPC error, trying next provider");
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, "RPC timeout, trying next provider");
                }
            }
        }
        metrics::record_rpc_error("chain_id");
        Err(BlockchainError::Rpc("All RPC providers failed".to_string()))
    }

    /// Get the latest block number.
    pub async fn get_block_number(&self) -> BlockchainResult<u64> {
        for (i, provider) in self.providers.iter().enumerate() {
            let fut = provider.get_block_number();
            match timeout(self.timeout_duration, fut).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => tracing::warn!(provider_idx = i, error = %e, "RPC error"),
                Err(_) => tracing::warn!(provider_idx = i, "RPC timeout"),
            }
        }
        metrics::record_rpc_error("block_number");
        Err(BlockchainError::Rpc("All providers failed to get block number".to_string()))
    }

    /// Get logs emitted by a contract within an inclusive block range.
    pub async fn get_logs(&self, address: Address, from_block: u64, to_block: u64) -> BlockchainResult<Vec<Log>> {
        let filter = Filter::new()
            .address(address)
            .from_block(from_block)
            .to_block(to_block);

        for (i, provider) in self.providers.iter().enumerate() {
            let fut = provider.get_logs(&filter);
            match timeout(self.timeout_duration, fut).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => tracing::warn!(provider_idx = i, error = %e, "RPC error"),
                Err(_) => tracing::warn!(provider_idx = i, "RPC timeout"),
            }
        }
        metrics::record_rpc_error("get_logs");
        Err(BlockchainError::Rpc("All providers failed to get logs".to_string()))
    }

    /// Get the balance of an address.
    pub async fn get_balance(&self, address: Address) -> BlockchainResult<U256> {
        for (i, provider) in self.providers.iter().enumerate() {
            let fut = provider.get_balance(address);
            match timeout(self.timeout_duration, fut).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => tracing::warn!(provider_idx = i, error = %e, "RPC error"),
                Err(_) => tracing::warn!(provider_idx = i, "RPC timeout"),
            }
        }
        metrics::record_rpc_error("balance");
        Err(BlockchainError::Rpc("All providers failed to get balance".to_string()))
    }

    /// Get the transaction count (nonce) for an address.
    pub async fn get_transaction_count(&self, address: Address) -> BlockchainResult<u64> {
        for (i, provider) in self.providers.iter().enumerate() {
            let fut = provider.get_transaction_count(address);
            match timeout(self.timeout_duration, fut).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => tracing::warn!(provider_idx = i, error = %e, "RPC error"),
                Err(_) => tracing::warn!(provider_idx = i, "RPC timeout"),
            }
        }
        metrics::record_rpc_error("transaction_count");
        Err(BlockchainError::Rpc("All providers failed to get transaction count".to_string()))
    }

    /// Get current gas price in wei.
    pub async fn get_gas_price(&self) -> BlockchainResult<u128> {
        for (i, provider) in self.providers.iter().enumerate() {
            let fut = provider.get_gas_price();
            match timeout(self.timeout_duration, fut).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => tracing::warn!(provider_idx = i, error = %e, "RPC error"),
                Err(_) => tracing::warn!(provider_idx = i, "RPC timeout"),
            }
        }
        metrics::record_rpc_error("gas_price");
        Err(BlockchainError::Rpc("All providers failed to get gas price".to_string()))
    }

    /// Broadcast a signed transaction.
    ///
    /// A node that answers with a rejection is authoritative: the error is
    /// classified and returned without trying the failovers.
    pub async fn send_raw_transaction(&self, raw: &[u8]) -> BlockchainResult<TxHash> {
        for (i, provider) in self.providers.iter().enumerate() {
            let fut = provider.send_raw_transaction(raw);
            match timeout(self.timeout_duration, fut).await {
                Ok(Ok(pending)) => return Ok(*pending.tx_hash()),
                Ok(Err(e)) => {
                    let classified = BlockchainError::from_send_error(&e.to_string());
                    if !classified.is_connectivity() {
                        return Err(classified);
                    }
                    tracing::warn!(provider_idx = i, error = %e, "RPC error");
                }
                Err(_) => tracing::warn!(provider_idx = i, "RPC timeout"),
            }
        }
        metrics::record_rpc_error("send_raw_transaction");
        Err(BlockchainError::Rpc("All providers failed to broadcast transaction".to_string()))
    }

    /// Get a transaction receipt by hash.
    pub async fn get_transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> BlockchainResult<Option<TransactionReceipt>> {
        for (i, provider) in self.providers.iter().enumerate() {
            let fut = provider.get_transaction_receipt(tx_hash);
            match timeout(self.timeout_duration, fut).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => tracing::warn!(provider_idx = i, error = %e, "RPC error"),
                Err(_) => tracing::warn!(provider_idx = i, "RPC timeout"),
            }
        }
        metrics::record_rpc_error("receipt");
        Err(BlockchainError::Rpc("All providers failed to get receipt".to_string()))
    }

    /// Check if the blockchain is reachable and healthy.
    ///
    /// Returns true if we can query the block number.
    pub async fn is_healthy(&self) -> bool {
        let healthy = self.get_block_number().await.is_ok();
        metrics::record_rpc_health(healthy);
        healthy
    }

    /// Get the configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }
}

impl Ledger for BlockchainClient {
    async fn chain_id(&self) -> BlockchainResult<ChainId> {
        self.get_chain_id().await
    }

    async fn block_number(&self) -> BlockchainResult<u64> {
        self.get_block_number().await
    }

    async fn get_logs(&self, address: Address, from_block: u64, to_block: u64) -> BlockchainResult<Vec<Log>> {
        BlockchainClient::get_logs(self, address, from_block, to_block).await
    }

    async fn get_balance(&self, address: Address) -> BlockchainResult<U256> {
        BlockchainClient::get_balance(self, address).await
    }

    async fn get_transaction_count(&self, address: Address) -> BlockchainResult<u64> {
        BlockchainClient::get_transaction_count(self, address).await
    }

    async fn get_gas_price(&self) -> BlockchainResult<u128> {
        BlockchainClient::get_gas_price(self).await
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> BlockchainResult<TxHash> {
        BlockchainClient::send_raw_transaction(self, &raw).await
    }

    async fn get_transaction_receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<LedgerReceipt>> {
        let receipt = BlockchainClient::get_transaction_receipt(self, tx_hash).await?;
        Ok(receipt.and_then(|r| {
            // A receipt without a block is still pending from our point of view.
            let block_number = r.block_number?;
            Some(LedgerReceipt {
                tx_hash: r.transaction_hash,
                block_number,
                success: r.status(),
                logs: r.inner.logs().iter().map(|log| log.inner.clone()).collect(),
            })
        }))
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> LedgerConfig {
        LedgerConfig {
            // Nothing listens on the discard port.
            rpc_url: "http://127.0.0.1:9".to_string(),
            failover_urls: Vec::new(),
            chain_id: Some(31337), // Anvil default
            rpc_timeout_secs: 2,
        }
    }

    #[test]
    fn test_client_creation() {
        // Creation does not touch the network
        let result = BlockchainClient::new(test_config());
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_primary_url() {
        let mut config = test_config();
        config.rpc_url = "not a url".to_string();
        let err = BlockchainClient::new(config).unwrap_err();
        assert!(err.to_string().contains("Invalid RPC URL"));
    }

    #[tokio::test]
    async fn test_rpc_failover() {
        let mut config = test_config();
        // Add a secondary unreachable URL
        config.failover_urls.push("http://127.0.0.1:10".to_string());

        let client = BlockchainClient::new(config).unwrap();

        // Both endpoints are unreachable, so every provider is tried and the call fails.
        let result = client.get_chain_id().await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("All RPC providers failed"));
    }
}
