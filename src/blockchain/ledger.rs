//! The ledger RPC surface the agent depends on.
//!
//! `BlockchainClient` implements this against a JSON-RPC node; tests
//! substitute an in-memory ledger.

use std::future::Future;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::Log;

use crate::blockchain::types::{BlockchainResult, ChainId, LedgerReceipt};

/// Read and write access to one ledger.
///
/// Every method is a suspension point of the caller's loop.
pub trait Ledger: Clone + Send + Sync + 'static {
    /// Chain ID reported by the node.
    fn chain_id(&self) -> impl Future<Output = BlockchainResult<ChainId>> + Send;

    /// Current head block height.
    fn block_number(&self) -> impl Future<Output = BlockchainResult<u64>> + Send;

    /// Logs emitted by `address` in `from_block..=to_block`.
    fn get_logs(
        &self,
        address: Address,
        from_block: u64,
        to_block: u64,
    ) -> impl Future<Output = BlockchainResult<Vec<Log>>> + Send;

    /// Native balance of `address` in wei.
    fn get_balance(&self, address: Address) -> impl Future<Output = BlockchainResult<U256>> + Send;

    /// Transaction count (next nonce) of `address`.
    fn get_transaction_count(
        &self,
        address: Address,
    ) -> impl Future<Output = BlockchainResult<u64>> + Send;

    /// Current gas price in wei.
    fn get_gas_price(&self) -> impl Future<Output = BlockchainResult<u128>> + Send;

    /// Broadcast a signed, EIP-2718 encoded transaction.
    fn send_raw_transaction(
        &self,
        raw: Bytes,
    ) -> impl Future<Output = BlockchainResult<TxHash>> + Send;

    /// Receipt of a mined transaction, `None` while pending.
    fn get_transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = BlockchainResult<Option<LedgerReceipt>>> + Send;
}
