//! Challenge event watcher.
//!
//! # Responsibilities
//! - Read the chain head and fetch verifier logs in the unseen range
//! - Decode `ChallengeGenerated` logs, isolating malformed ones
//! - Hand back events in (block, log index) order with the cursor to adopt
//!
//! The watcher never moves the cursor itself; the caller does so after the
//! batch is handled, which keeps a failed poll from skipping any block.

use alloy::primitives::Address;
use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;

use crate::blockchain::contract::ChallengeGenerated;
use crate::blockchain::{BlockchainResult, Ledger};
use crate::config::MonitorConfig;
use crate::monitor::types::{ChallengeEvent, Cursor, LogDecodeError, PollBatch};
use crate::observability::metrics;

/// Polls one contract for challenge events.
pub struct ChainWatcher<L: Ledger> {
    ledger: L,
    contract: Address,
    config: MonitorConfig,
}

impl<L: Ledger> ChainWatcher<L> {
    pub fn new(ledger: L, contract: Address, config: MonitorConfig) -> Self {
        Self {
            ledger,
            contract,
            config,
        }
    }

    /// Fetch the challenges emitted after `cursor`.
    ///
    /// Any RPC failure is returned as-is and nothing is consumed.
    pub async fn poll(&self, cursor: Cursor) -> BlockchainResult<PollBatch> {
        let head = self.ledger.block_number().await?;
        let target = head.saturating_sub(self.config.confirmation_depth);

        if target <= cursor.block() {
            return Ok(PollBatch {
                next_cursor: cursor.block(),
                ..Default::default()
            });
        }

        let from_block = cursor.block() + 1;
        let to_block = target.min(cursor.block().saturating_add(self.config.max_block_range));
        if to_block < target {
            tracing::debug!(
                from_block,
                to_block,
                head,
                "Catching up, limiting log query range"
            );
        }

        let logs = self.ledger.get_logs(self.contract, from_block, to_block).await?;

        let mut batch = PollBatch {
            next_cursor: to_block,
            ..Default::default()
        };
        for log in &logs {
            match decode_challenge(log) {
                Some(Ok(event)) => batch.events.push(event),
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Skipping undecodable challenge log");
                    metrics::record_decode_error();
                    batch.decode_errors.push(e);
                }
                None => {}
            }
        }
        batch.events.sort_by_key(ChallengeEvent::position);

        if !batch.events.is_empty() {
            tracing::info!(
                from_block,
                to_block,
                count = batch.events.len(),
                "Found challenges"
            );
        }

        Ok(batch)
    }
}

/// Decode one contract log.
///
/// Returns `None` for logs that are not challenges (other contract events,
/// or logs the node flags as removed by a reorg).
pub fn decode_challenge(log: &Log) -> Option<Result<ChallengeEvent, LogDecodeError>> {
    if log.inner.data.topics().first() != Some(&ChallengeGenerated::SIGNATURE_HASH) {
        return None;
    }
    if log.removed {
        tracing::debug!(block_number = ?log.block_number, "Ignoring removed log");
        return None;
    }

    let decoded = match log.log_decode::<ChallengeGenerated>() {
        Ok(decoded) => decoded,
        Err(e) => {
            return Some(Err(LogDecodeError::Malformed {
                block_number: log.block_number,
                reason: e.to_string(),
            }))
        }
    };

    let (Some(block_number), Some(log_index)) = (log.block_number, log.log_index) else {
        return Some(Err(LogDecodeError::MissingPosition));
    };

    Some(Ok(ChallengeEvent {
        challenge: decoded.inner.data.challenge,
        block_number,
        log_index,
        tx_hash: log.transaction_hash,
    }))
}
