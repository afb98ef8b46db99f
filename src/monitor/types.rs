//! Challenge monitoring types.

use alloy::primitives::{Bytes, TxHash};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A challenge emitted by the verifier contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeEvent {
    /// Challenge bytes to sign.
    pub challenge: Bytes,
    /// Block number where the event occurred.
    pub block_number: u64,
    /// Position of the log within its block.
    pub log_index: u64,
    /// Transaction that issued the challenge, when the node reports it.
    pub tx_hash: Option<TxHash>,
}

impl ChallengeEvent {
    /// Sort key that fixes processing order.
    pub fn position(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }
}

/// A log from the verifier contract that could not be turned into a challenge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogDecodeError {
    /// ABI payload did not match `ChallengeGenerated(bytes)`.
    #[error("malformed ChallengeGenerated payload at block {block_number:?}: {reason}")]
    Malformed {
        block_number: Option<u64>,
        reason: String,
    },

    /// Node returned a log without its block position.
    #[error("ChallengeGenerated log without block number or log index")]
    MissingPosition,
}

/// Result of one poll of the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollBatch {
    /// Challenges in ascending (block, log index) order.
    pub events: Vec<ChallengeEvent>,
    /// Logs that failed to decode. The rest of the batch is unaffected.
    pub decode_errors: Vec<LogDecodeError>,
    /// Cursor to adopt once every event has been handled.
    pub next_cursor: u64,
}

/// Highest block whose events have been fully handed to the agent.
///
/// Never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Cursor(u64);

impl Cursor {
    pub fn new(block: u64) -> Self {
        Self(block)
    }

    pub fn block(&self) -> u64 {
        self.0
    }

    /// Advance to `block`; lower values are ignored.
    pub fn advance(&mut self, block: u64) {
        if block > self.0 {
            self.0 = block;
        } else if block < self.0 {
            tracing::warn!(cursor = self.0, requested = block, "Ignoring backwards cursor move");
        }
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
