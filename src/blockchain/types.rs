//! Chain-specific types and error definitions.

use alloy::primitives::{Log, TxHash};
use thiserror::Error;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// The node rejected the transaction's nonce.
    #[error("Nonce conflict: {0}")]
    NonceConflict(String),

    /// The node rejected the transaction for lack of funds.
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// The node rejected the transaction for another reason.
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    /// Invalid private key format or signing failure.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },
}

impl BlockchainError {
    /// Classify a node's rejection of `eth_sendRawTransaction`.
    pub fn from_send_error(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("nonce too low")
            || lower.contains("nonce too high")
            || lower.contains("already known")
            || lower.contains("replacement transaction underpriced")
            || lower.contains("invalid nonce")
        {
            BlockchainError::NonceConflict(message.to_string())
        } else if lower.contains("insufficient funds") {
            BlockchainError::InsufficientFunds(message.to_string())
        } else if lower.contains("execution reverted")
            || lower.contains("intrinsic gas")
            || lower.contains("exceeds block gas limit")
            || lower.contains("fee cap")
        {
            BlockchainError::Rejected(message.to_string())
        } else {
            BlockchainError::Rpc(message.to_string())
        }
    }

    /// True for transport-level failures where the node never judged the request.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, BlockchainError::Rpc(_) | BlockchainError::Timeout(_))
    }
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// The parts of a transaction receipt the agent acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerReceipt {
    /// Hash of the mined transaction.
    pub tx_hash: TxHash,
    /// Block the transaction was included in.
    pub block_number: u64,
    /// Execution status.
    pub success: bool,
    /// Logs emitted by the transaction.
    pub logs: Vec<Log>,
}
