//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! LedgerConfig (RPC URLs, timeouts)
//!     → client.rs (RPC connection with failover and timeouts)
//!     → ledger.rs (the RPC surface the agent depends on)
//!
//! Signed challenge
//!     → transaction.rs (nonce, gas, build, broadcast, receipt)
//!         → contract.rs (verifyChallenge ABI encoding)
//!         → wallet.rs (account key, transaction signing)
//! ```
//!
//! # Security Constraints
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod contract;
pub mod ledger;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::BlockchainClient;
pub use ledger::Ledger;
pub use transaction::{Confirmation, SubmissionError, TransactionSubmitter};
pub use types::{BlockchainError, BlockchainResult, ChainId, LedgerReceipt};
pub use wallet::AccountWallet;
