//! Challenge-response loop.
//!
//! # Responsibilities
//! - Connect: check the chain, warn on an empty account, place the cursor
//! - Tick: poll once, answer every challenge in order, then advance the cursor
//! - Run: tick on a fixed interval until shutdown or a fatal error
//!
//! Challenges are answered strictly one at a time. A challenge that still
//! fails after its retries is reported and the batch moves on; a fatal error
//! stops the loop with the cursor left where it was.

use alloy::primitives::{Address, Bytes};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::sleep;

use crate::agent::error::AgentError;
use crate::agent::record::{EventFailure, SubmissionRecord, TickReport};
use crate::agent::state::AgentState;
use crate::blockchain::{AccountWallet, BlockchainError, Confirmation, Ledger, SubmissionError, TransactionSubmitter};
use crate::config::{MonitorConfig, SubmissionConfig};
use crate::identity::{ChallengeSignature, ChallengeSigner, SigningError};
use crate::monitor::{ChainWatcher, ChallengeEvent, Cursor};
use crate::observability::metrics::{self, ChallengeOutcome};
use crate::resilience::Backoff;
use crate::secure_element::SecureElement;

/// Drives the device's side of the challenge protocol.
pub struct Orchestrator<L: Ledger> {
    ledger: L,
    watcher: ChainWatcher<L>,
    signer: ChallengeSigner,
    submitter: TransactionSubmitter<L>,
    chain_id: u64,
    monitor: MonitorConfig,
    submission: SubmissionConfig,
    cursor: Cursor,
    state: AgentState,
    history: VecDeque<SubmissionRecord>,
}

impl<L: Ledger> Orchestrator<L> {
    pub fn new(
        ledger: L,
        element: Arc<dyn SecureElement>,
        wallet: AccountWallet,
        contract: Address,
        monitor: MonitorConfig,
        submission: SubmissionConfig,
    ) -> Self {
        let chain_id = wallet.chain_id();
        Self {
            watcher: ChainWatcher::new(ledger.clone(), contract, monitor.clone()),
            signer: ChallengeSigner::new(element),
            submitter: TransactionSubmitter::new(ledger.clone(), wallet, contract, submission.clone()),
            ledger,
            chain_id,
            monitor,
            submission,
            cursor: Cursor::default(),
            state: AgentState::Init,
            history: VecDeque::new(),
        }
    }

    /// Check the ledger and place the cursor.
    ///
    /// Any failure here is fatal.
    pub async fn connect(&mut self) -> Result<(), AgentError> {
        match self.try_connect().await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.transition(AgentState::Fatal);
                Err(e)
            }
        }
    }

    async fn try_connect(&mut self) -> Result<(), AgentError> {
        let chain_id = self.ledger.chain_id().await.map_err(AgentError::Connectivity)?.0;
        if chain_id != self.chain_id {
            return Err(AgentError::Config(
                BlockchainError::ChainMismatch {
                    expected: self.chain_id,
                    actual: chain_id,
                }
                .to_string(),
            ));
        }

        let account = self.submitter.address();
        let balance = self.ledger.get_balance(account).await.map_err(AgentError::Connectivity)?;
        if balance.is_zero() {
            tracing::warn!(account = %account, "Account has no balance, verification transactions will fail");
        }

        let start = match self.monitor.start_after_block {
            Some(block) => block,
            None => self.ledger.block_number().await.map_err(AgentError::Connectivity)?,
        };
        self.cursor = Cursor::new(start);
        metrics::record_cursor(start);
        self.transition(AgentState::Connected);

        tracing::info!(
            chain_id,
            account = %account,
            contract = %self.submitter.contract(),
            cursor = start,
            "Connected to ledger"
        );
        Ok(())
    }

    /// One pass of the loop: poll, answer challenges in order, advance the cursor.
    ///
    /// On a polling failure the cursor is unchanged and the error is returned.
    /// On a fatal error mid-batch the cursor is also unchanged.
    pub async fn tick(&mut self) -> Result<TickReport, AgentError> {
        self.transition(AgentState::Monitoring);

        let batch = match self.watcher.poll(self.cursor).await {
            Ok(batch) => batch,
            Err(e) => {
                self.transition(AgentState::Error);
                return Err(AgentError::Connectivity(e));
            }
        };

        let mut report = TickReport {
            events: batch.events.len(),
            decode_errors: batch.decode_errors.iter().map(ToString::to_string).collect(),
            ..Default::default()
        };

        for event in batch.events {
            match self.handle_event(&event).await {
                Ok(record) => {
                    self.remember(record.clone());
                    report.confirmed.push(record);
                }
                Err(e) if e.is_fatal() => {
                    self.transition(AgentState::Fatal);
                    tracing::error!(
                        block_number = event.block_number,
                        log_index = event.log_index,
                        error = %e,
                        "Fatal error while answering challenge"
                    );
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!(
                        block_number = event.block_number,
                        log_index = event.log_index,
                        challenge = %event.challenge,
                        error = %e,
                        "Giving up on challenge"
                    );
                    report.failures.push(EventFailure {
                        event: event.clone(),
                        error: e.to_string(),
                    });
                }
            }
            self.transition(AgentState::Monitoring);
        }

        self.cursor.advance(batch.next_cursor);
        metrics::record_cursor(self.cursor.block());
        report.cursor = self.cursor.block();
        Ok(report)
    }

    /// Tick on the configured interval until `shutdown` fires or a fatal error.
    ///
    /// Connects first if needed. Recoverable errors back off before the next tick.
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) -> Result<(), AgentError> {
        if self.state == AgentState::Init {
            self.connect().await?;
        }

        let poll_interval = Duration::from_millis(self.monitor.poll_interval_ms);
        let mut backoff = Backoff::from_config(&self.submission);

        tracing::info!(
            poll_interval_ms = self.monitor.poll_interval_ms,
            cursor = %self.cursor,
            "Challenge loop started"
        );

        loop {
            // A tick dropped here leaves the cursor untouched; its batch is
            // fetched again on restart and re-signed identically.
            let outcome = tokio::select! {
                result = self.tick() => Some(result),
                _ = shutdown.recv() => None,
            };
            let Some(result) = outcome else {
                tracing::info!(cursor = %self.cursor, "Shutdown requested mid-tick, stopping challenge loop");
                return Ok(());
            };

            let delay = match result {
                Ok(report) => {
                    backoff.reset();
                    if !report.is_idle() {
                        tracing::info!(
                            events = report.events,
                            confirmed = report.confirmed.len(),
                            failed = report.failures.len(),
                            decode_errors = report.decode_errors.len(),
                            cursor = report.cursor,
                            "Tick complete"
                        );
                    }
                    poll_interval
                }
                Err(e) if e.is_fatal() => {
                    self.transition(AgentState::Fatal);
                    tracing::error!(error = %e, "Challenge loop stopped");
                    return Err(e);
                }
                Err(e) => {
                    let delay = backoff.next_delay().max(poll_interval);
                    tracing::warn!(
                        error = %e,
                        failures = backoff.failures(),
                        delay_ms = delay.as_millis() as u64,
                        "Tick failed, backing off"
                    );
                    delay
                }
            };

            tokio::select! {
                _ = sleep(delay) => {}
                _ = shutdown.recv() => {
                    tracing::info!(cursor = %self.cursor, "Shutdown requested, stopping challenge loop");
                    return Ok(());
                }
            }
        }
    }

    async fn handle_event(&mut self, event: &ChallengeEvent) -> Result<SubmissionRecord, AgentError> {
        tracing::info!(
            block_number = event.block_number,
            log_index = event.log_index,
            challenge = %event.challenge,
            "Answering challenge"
        );

        self.transition(AgentState::Signing);
        let signature = match self.sign_with_retry(&event.challenge).await {
            Ok(signature) => signature,
            Err(e) => {
                metrics::record_challenge(ChallengeOutcome::SigningFailed);
                return Err(e.into());
            }
        };

        self.transition(AgentState::Submitting);
        let confirmation = match self.submit_with_retry(&event.challenge, &signature).await {
            Ok(confirmation) => confirmation,
            Err(e) => {
                metrics::record_challenge(ChallengeOutcome::SubmissionFailed);
                return Err(e.into());
            }
        };

        self.transition(AgentState::Confirmed);
        let outcome = match confirmation.accepted {
            Some(false) => ChallengeOutcome::Rejected,
            _ => ChallengeOutcome::Verified,
        };
        metrics::record_challenge(outcome);

        tracing::info!(
            tx_hash = %confirmation.tx_hash,
            block_number = confirmation.block_number,
            accepted = ?confirmation.accepted,
            "Challenge answered"
        );

        Ok(SubmissionRecord {
            challenge: event.challenge.clone(),
            challenge_block: event.block_number,
            signature: signature.to_bytes(),
            tx_hash: confirmation.tx_hash,
            confirmation_block: confirmation.block_number,
            nonce: confirmation.nonce,
            accepted: confirmation.accepted,
        })
    }

    async fn sign_with_retry(&mut self, challenge: &[u8]) -> Result<ChallengeSignature, SigningError> {
        let mut backoff = Backoff::from_config(&self.submission);
        let mut attempt = 1;

        loop {
            // Hardware helpers block; keep them off the runtime threads.
            let signer = self.signer.clone();
            let message = challenge.to_vec();
            let result = tokio::task::spawn_blocking(move || signer.sign(&message))
                .await
                .unwrap_or_else(|e| Err(SigningError::Signer(format!("signing task failed: {}", e))));

            match result {
                Ok(signature) => return Ok(signature),
                Err(SigningError::SecureElement(e))
                    if !e.is_permanent() && attempt < self.submission.max_attempts =>
                {
                    let delay = backoff.next_delay();
                    tracing::warn!(attempt, error = %e, delay_ms = delay.as_millis() as u64, "Secure element busy, retrying");
                    sleep(delay).await;
                    attempt += 1;
                    self.transition(AgentState::Signing);
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn submit_with_retry(
        &mut self,
        challenge: &Bytes,
        signature: &ChallengeSignature,
    ) -> Result<Confirmation, SubmissionError> {
        let mut backoff = Backoff::from_config(&self.submission);
        let mut attempt = 1;

        loop {
            match self.submitter.submit(challenge, signature).await {
                Ok(confirmation) => return Ok(confirmation),
                Err(e) if is_retryable(&e) && attempt < self.submission.max_attempts => {
                    let delay = backoff.next_delay();
                    tracing::warn!(attempt, error = %e, delay_ms = delay.as_millis() as u64, "Submission failed, retrying");
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn remember(&mut self, record: SubmissionRecord) {
        if self.submission.history_limit == 0 {
            return;
        }
        while self.history.len() >= self.submission.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }

    fn transition(&mut self, next: AgentState) {
        if self.state == next {
            return;
        }
        if !self.state.can_transition_to(next) {
            tracing::debug!(from = %self.state, to = %next, "Unexpected state transition");
        }
        tracing::trace!(from = %self.state, to = %next, "State transition");
        self.state = next;
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Most recent confirmed submissions, oldest first.
    pub fn history(&self) -> &VecDeque<SubmissionRecord> {
        &self.history
    }
}

/// Whether another attempt at the same submission can succeed.
fn is_retryable(e: &SubmissionError) -> bool {
    match e {
        SubmissionError::NonceExhausted { .. }
        | SubmissionError::GasPriceTooHigh { .. }
        | SubmissionError::ReceiptTimeout { .. } => true,
        SubmissionError::Ledger(e) => e.is_connectivity() || matches!(e, BlockchainError::NonceConflict(_)),
        SubmissionError::InsufficientBalance { .. } | SubmissionError::Reverted { .. } => false,
    }
}
