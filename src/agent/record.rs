//! Operator-visible results of the challenge loop.

use alloy::primitives::{Bytes, TxHash};
use serde::Serialize;

use crate::monitor::ChallengeEvent;

/// One answered challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionRecord {
    /// The challenge that was answered.
    pub challenge: Bytes,
    /// Block the challenge was emitted in.
    pub challenge_block: u64,
    /// The 65-byte signature that was submitted.
    pub signature: Bytes,
    /// Verification transaction hash.
    pub tx_hash: TxHash,
    /// Block the verification transaction was mined in.
    pub confirmation_block: u64,
    /// Account nonce the transaction used.
    pub nonce: u64,
    /// Contract verdict, when the receipt carried one.
    pub accepted: Option<bool>,
}

/// A challenge that was given up on after its retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventFailure {
    pub event: ChallengeEvent,
    pub error: String,
}

/// What one tick of the loop did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Challenges found in this tick.
    pub events: usize,
    /// Challenges answered and confirmed, in processing order.
    pub confirmed: Vec<SubmissionRecord>,
    /// Challenges that could not be answered.
    pub failures: Vec<EventFailure>,
    /// Logs that could not be decoded.
    pub decode_errors: Vec<String>,
    /// Cursor after the tick.
    pub cursor: u64,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.events == 0 && self.decode_errors.is_empty()
    }
}
