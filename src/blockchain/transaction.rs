//! Verification transaction building, signing, and confirmation monitoring.
//!
//! # Responsibilities
//! - Build the `verifyChallenge` call with gas parameters
//! - Sign with the account wallet and broadcast
//! - Retry nonce conflicts with a freshly read nonce
//! - Poll for the receipt until confirmed or timed out

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::{SolCall, SolEvent};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::{interval, timeout};

use crate::blockchain::contract::{verifyChallengeCall, ChallengeVerified};
use crate::blockchain::ledger::Ledger;
use crate::blockchain::types::{BlockchainError, LedgerReceipt};
use crate::blockchain::wallet::AccountWallet;
use crate::config::SubmissionConfig;
use crate::identity::ChallengeSignature;
use crate::observability::metrics;

const WEI_PER_GWEI: u128 = 1_000_000_000;

/// Errors that can occur while submitting a verification transaction.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// Every broadcast attempt was rejected for its nonce.
    #[error("Nonce conflict persisted after {attempts} attempts")]
    NonceExhausted { attempts: u32 },

    /// Gas price exceeded maximum allowed.
    #[error("Gas price {current_gwei} gwei exceeds maximum {max_gwei} gwei")]
    GasPriceTooHigh { current_gwei: u64, max_gwei: u64 },

    /// The account cannot pay for the transaction.
    #[error("Account balance {balance} wei cannot cover {required} wei of gas")]
    InsufficientBalance { balance: U256, required: U256 },

    /// Transaction was broadcast but no receipt arrived in time.
    #[error("No receipt for {tx_hash} within {timeout_secs} seconds")]
    ReceiptTimeout { tx_hash: TxHash, timeout_secs: u64 },

    /// Transaction was mined but reverted.
    #[error("Transaction {tx_hash} reverted in block {block_number}")]
    Reverted { tx_hash: TxHash, block_number: u64 },

    /// Underlying ledger failure.
    #[error(transparent)]
    Ledger(#[from] BlockchainError),
}

impl SubmissionError {
    /// True when no transaction from this account can succeed.
    pub fn is_insufficient_balance(&self) -> bool {
        matches!(
            self,
            SubmissionError::InsufficientBalance { .. }
                | SubmissionError::Ledger(BlockchainError::InsufficientFunds(_))
        )
    }
}

/// A mined verification transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    /// Transaction hash.
    pub tx_hash: TxHash,
    /// Block the transaction was mined in.
    pub block_number: u64,
    /// Nonce the transaction was sent with.
    pub nonce: u64,
    /// Contract verdict from its `ChallengeVerified` log, when emitted.
    pub accepted: Option<bool>,
}

/// Builds, signs, broadcasts and confirms verification transactions.
pub struct TransactionSubmitter<L: Ledger> {
    ledger: L,
    wallet: AccountWallet,
    contract: Address,
    config: SubmissionConfig,
}

impl<L: Ledger> TransactionSubmitter<L> {
    /// Create a new submitter for one account and one contract.
    pub fn new(ledger: L, wallet: AccountWallet, contract: Address, config: SubmissionConfig) -> Self {
        Self {
            ledger,
            wallet,
            contract,
            config,
        }
    }

    /// Submit `verifyChallenge(challenge, signature)` and wait for its receipt.
    pub async fn submit(
        &self,
        challenge: &Bytes,
        signature: &ChallengeSignature,
    ) -> Result<Confirmation, SubmissionError> {
        let input = Bytes::from(
            verifyChallengeCall {
                challenge: challenge.clone(),
                signature: signature.to_bytes(),
            }
            .abi_encode(),
        );
        let started = Instant::now();

        for attempt in 1..=self.config.max_nonce_retries {
            let chain_count = self.ledger.get_transaction_count(self.wallet.address()).await?;
            let nonce = if attempt == 1 {
                self.wallet.sync_nonce(chain_count)
            } else {
                self.wallet.reset_nonce(chain_count);
                chain_count
            };

            let gas_price = self.gas_price().await?;
            self.ensure_balance(gas_price).await?;

            let tx = TransactionRequest::default()
                .with_to(self.contract)
                .with_value(U256::ZERO)
                .with_input(input.clone())
                .with_nonce(nonce)
                .with_gas_price(gas_price)
                .with_gas_limit(self.config.gas_limit);
            let raw = self.wallet.sign_transaction(tx).await?;

            let tx_hash = match self.ledger.send_raw_transaction(raw).await {
                Ok(hash) => hash,
                Err(BlockchainError::NonceConflict(reason)) => {
                    tracing::warn!(
                        nonce = nonce,
                        attempt = attempt,
                        reason = %reason,
                        "Nonce conflict, re-reading transaction count"
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            self.wallet.mark_used(nonce);

            tracing::info!(
                tx_hash = %tx_hash,
                nonce = nonce,
                gas_price = gas_price,
                "Verification transaction broadcast"
            );

            let receipt = match self.wait_for_receipt(tx_hash).await {
                Ok(receipt) => receipt,
                Err(e) => {
                    // The node may have dropped the transaction. Trust its
                    // count again so the next submission cannot open a gap.
                    self.wallet.reset_nonce(chain_count);
                    tracing::warn!(
                        tx_hash = %tx_hash,
                        nonce = nonce,
                        chain_count = chain_count,
                        "No receipt, local nonce reset to chain count"
                    );
                    return Err(e);
                }
            };
            metrics::record_submission_latency(started.elapsed());

            if !receipt.success {
                return Err(SubmissionError::Reverted {
                    tx_hash,
                    block_number: receipt.block_number,
                });
            }

            return Ok(Confirmation {
                tx_hash,
                block_number: receipt.block_number,
                nonce,
                accepted: self.verdict(&receipt, challenge),
            });
        }

        Err(SubmissionError::NonceExhausted {
            attempts: self.config.max_nonce_retries,
        })
    }

    /// Current gas price with the configured multiplier, capped by the configured maximum.
    async fn gas_price(&self) -> Result<u128, SubmissionError> {
        let gas_price = self.ledger.get_gas_price().await?;
        capped_gas_price(
            gas_price,
            self.config.gas_price_multiplier,
            self.config.max_gas_price_gwei,
        )
    }

    async fn ensure_balance(&self, gas_price: u128) -> Result<(), SubmissionError> {
        let balance = self.ledger.get_balance(self.wallet.address()).await?;
        let required = U256::from(gas_price) * U256::from(self.config.gas_limit);
        if balance < required {
            return Err(SubmissionError::InsufficientBalance { balance, required });
        }
        Ok(())
    }

    /// Wait for a transaction receipt.
    ///
    /// Transient RPC failures while waiting are logged and polling continues
    /// until the deadline.
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<LedgerReceipt, SubmissionError> {
        let timeout_duration = Duration::from_secs(self.config.receipt_timeout_secs);
        let poll_interval = Duration::from_millis(self.config.receipt_poll_interval_ms);

        let result = timeout(timeout_duration, async {
            let mut ticker = interval(poll_interval);

            loop {
                ticker.tick().await;

                match self.ledger.get_transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => tracing::debug!(tx_hash = %tx_hash, "Transaction pending"),
                    Err(e) => tracing::warn!(tx_hash = %tx_hash, error = %e, "Receipt lookup failed"),
                }
            }
        })
        .await;

        result.map_err(|_| SubmissionError::ReceiptTimeout {
            tx_hash,
            timeout_secs: self.config.receipt_timeout_secs,
        })
    }

    fn verdict(&self, receipt: &LedgerReceipt, challenge: &Bytes) -> Option<bool> {
        receipt
            .logs
            .iter()
            .filter(|log| log.address == self.contract)
            .filter_map(|log| ChallengeVerified::decode_log_data(&log.data).ok())
            .find(|event| &event.challenge == challenge)
            .map(|event| event.isValid)
    }

    /// Get the wallet address.
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Get the contract address.
    pub fn contract(&self) -> Address {
        self.contract
    }
}

/// Apply a safety multiplier to a node's gas price estimate.
pub fn adjusted_gas_price(gas_price: u128, multiplier: f64) -> u128 {
    (gas_price as f64 * multiplier) as u128
}

/// The price a transaction will actually carry, rejected above `max_gwei`.
///
/// The cap applies after the multiplier.
pub fn capped_gas_price(gas_price: u128, multiplier: f64, max_gwei: u64) -> Result<u128, SubmissionError> {
    let adjusted = adjusted_gas_price(gas_price, multiplier);
    let adjusted_gwei = adjusted / WEI_PER_GWEI;

    if adjusted_gwei > max_gwei as u128 {
        return Err(SubmissionError::GasPriceTooHigh {
            current_gwei: u64::try_from(adjusted_gwei).unwrap_or(u64::MAX),
            max_gwei,
        });
    }

    Ok(adjusted)
}
