//! Shared utilities for agent integration tests.
//!
//! `MockLedger` is an in-memory chain: scripted logs and head height, a
//! nonce-checking mempool that mines every accepted transaction into the
//! next block, and failure injection for each RPC the agent uses. Dropped
//! and gap-nonce transactions land in `pending` and are never mined.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use alloy::consensus::{Transaction, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{Address, Bytes, LogData, TxHash, B256, U256};
use alloy::rpc::types::Log;
use alloy::sol_types::{SolCall, SolEvent};

use device_verifier::agent::Orchestrator;
use device_verifier::blockchain::contract::{verifyChallengeCall, ChallengeGenerated, ChallengeVerified};
use device_verifier::blockchain::{AccountWallet, BlockchainError, BlockchainResult, ChainId, Ledger, LedgerReceipt};
use device_verifier::config::{MonitorConfig, SubmissionConfig};
use device_verifier::secure_element::{SecureElement, SimulatedSecureElement};

pub const CHAIN_ID: u64 = 31337;

/// Anvil's first account.
pub const ACCOUNT_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const ROOT_SECRET: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

pub const GAS_PRICE: u128 = 1_000_000_000;

pub fn contract() -> Address {
    "0x5FbDB2315678afecb367f032d93F642f64180aa3".parse().unwrap()
}

/// A verification transaction the ledger accepted.
#[derive(Debug, Clone)]
pub struct SentTx {
    pub hash: TxHash,
    pub nonce: u64,
    pub to: Option<Address>,
    pub challenge: Bytes,
    pub signature: Bytes,
    pub block_number: u64,
}

pub struct LedgerState {
    pub chain_id: u64,
    pub head: u64,
    pub logs: Vec<Log>,
    pub balance: U256,
    pub tx_count: u64,
    pub gas_price: u128,
    pub sent: Vec<SentTx>,
    pub receipts: HashMap<TxHash, LedgerReceipt>,
    /// Ranges requested through `get_logs`.
    pub log_queries: Vec<(u64, u64)>,
    /// Verdict the contract emits for every verification.
    pub verdict: Option<bool>,
    /// Mine transactions as reverted.
    pub revert: bool,
    /// Never produce receipts.
    pub withhold_receipts: bool,
    /// Fail the next N `get_logs` calls.
    pub fail_get_logs: u32,
    /// Fail the next N `block_number` calls.
    pub fail_block_number: u32,
    /// Reject the next N broadcasts with a nonce error.
    pub nonce_conflicts: u32,
    /// Fail every `chain_id` call.
    pub chain_down: bool,
    /// Hold transactions whose nonce is ahead of the count instead of
    /// rejecting them. Held transactions are never mined.
    pub queue_gap_nonces: bool,
    /// Accept the next N broadcasts, then silently discard them.
    pub drop_next: u32,
    /// Transactions accepted but never mined.
    pub pending: Vec<SentTx>,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            chain_id: CHAIN_ID,
            head: 0,
            logs: Vec::new(),
            balance: U256::from(10u128.pow(18)),
            tx_count: 0,
            gas_price: GAS_PRICE,
            sent: Vec::new(),
            receipts: HashMap::new(),
            log_queries: Vec::new(),
            verdict: Some(true),
            revert: false,
            withhold_receipts: false,
            fail_get_logs: 0,
            fail_block_number: 0,
            nonce_conflicts: 0,
            chain_down: false,
            queue_gap_nonces: false,
            drop_next: 0,
            pending: Vec::new(),
        }
    }
}

#[derive(Clone, Default)]
pub struct MockLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl MockLedger {
    pub fn new(head: u64) -> Self {
        let ledger = Self::default();
        ledger.state().head = head;
        ledger
    }

    pub fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap()
    }

    /// Emit `ChallengeGenerated(challenge)` from the verifier contract.
    pub fn emit_challenge(&self, challenge: &[u8], block: u64, log_index: u64) {
        let data = ChallengeGenerated {
            challenge: Bytes::copy_from_slice(challenge),
        }
        .encode_log_data();
        self.push_log(data, block, log_index);
    }

    /// Emit a log whose topic claims to be a challenge but whose payload is garbage.
    pub fn emit_malformed(&self, block: u64, log_index: u64) {
        let data = LogData::new_unchecked(vec![ChallengeGenerated::SIGNATURE_HASH], Bytes::from(vec![0xff; 7]));
        self.push_log(data, block, log_index);
    }

    fn push_log(&self, data: LogData, block: u64, log_index: u64) {
        let mut state = self.state();
        state.head = state.head.max(block);
        state.logs.push(rpc_log(contract(), data, block, log_index));
    }

    pub fn sent(&self) -> Vec<SentTx> {
        self.state().sent.clone()
    }

    pub fn pending(&self) -> Vec<SentTx> {
        self.state().pending.clone()
    }
}

pub fn rpc_log(address: Address, data: LogData, block: u64, log_index: u64) -> Log {
    Log {
        inner: alloy::primitives::Log { address, data },
        block_number: Some(block),
        log_index: Some(log_index),
        transaction_hash: Some(B256::with_last_byte(log_index as u8)),
        ..Default::default()
    }
}

impl Ledger for MockLedger {
    async fn chain_id(&self) -> BlockchainResult<ChainId> {
        let state = self.state();
        if state.chain_down {
            return Err(BlockchainError::Rpc("connection refused".into()));
        }
        Ok(ChainId(state.chain_id))
    }

    async fn block_number(&self) -> BlockchainResult<u64> {
        let mut state = self.state();
        if state.fail_block_number > 0 {
            state.fail_block_number -= 1;
            return Err(BlockchainError::Timeout(1));
        }
        Ok(state.head)
    }

    async fn get_logs(&self, address: Address, from_block: u64, to_block: u64) -> BlockchainResult<Vec<Log>> {
        let mut state = self.state();
        if state.fail_get_logs > 0 {
            state.fail_get_logs -= 1;
            return Err(BlockchainError::Rpc("getLogs failed".into()));
        }
        state.log_queries.push((from_block, to_block));

        // Node order is arbitrary; the watcher sorts.
        let mut logs: Vec<Log> = state
            .logs
            .iter()
            .filter(|log| log.inner.address == address)
            .filter(|log| {
                let block = log.block_number.unwrap_or_default();
                block >= from_block && block <= to_block
            })
            .cloned()
            .collect();
        logs.reverse();
        Ok(logs)
    }

    async fn get_balance(&self, _address: Address) -> BlockchainResult<U256> {
        Ok(self.state().balance)
    }

    async fn get_transaction_count(&self, _address: Address) -> BlockchainResult<u64> {
        Ok(self.state().tx_count)
    }

    async fn get_gas_price(&self) -> BlockchainResult<u128> {
        Ok(self.state().gas_price)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> BlockchainResult<TxHash> {
        let envelope = TxEnvelope::decode_2718(&mut raw.as_ref())
            .map_err(|e| BlockchainError::Rejected(format!("undecodable transaction: {e}")))?;
        let call = verifyChallengeCall::abi_decode(envelope.input())
            .map_err(|e| BlockchainError::Rejected(format!("bad calldata: {e}")))?;

        let mut state = self.state();
        if state.nonce_conflicts > 0 {
            state.nonce_conflicts -= 1;
            return Err(BlockchainError::from_send_error("nonce too low"));
        }
        let hash = *envelope.tx_hash();
        let unmined = SentTx {
            hash,
            nonce: envelope.nonce(),
            to: envelope.to(),
            challenge: call.challenge.clone(),
            signature: call.signature.clone(),
            block_number: 0,
        };
        if state.queue_gap_nonces && envelope.nonce() > state.tx_count {
            state.pending.push(unmined);
            return Ok(hash);
        }
        if state.drop_next > 0 && envelope.nonce() == state.tx_count {
            state.drop_next -= 1;
            state.pending.push(unmined);
            return Ok(hash);
        }
        if envelope.nonce() != state.tx_count {
            return Err(BlockchainError::from_send_error(&format!(
                "invalid nonce: expected {}, got {}",
                state.tx_count,
                envelope.nonce()
            )));
        }

        state.tx_count += 1;
        state.head += 1;
        let block_number = state.head;

        let mut logs = Vec::new();
        if let Some(valid) = state.verdict {
            let data = ChallengeVerified {
                challenge: call.challenge.clone(),
                isValid: valid,
            }
            .encode_log_data();
            logs.push(alloy::primitives::Log { address: contract(), data: data.clone() });
            // Visible to the watcher too, which must skip it.
            state.logs.push(rpc_log(contract(), data, block_number, 0));
        }

        if !state.withhold_receipts {
            let receipt = LedgerReceipt {
                tx_hash: hash,
                block_number,
                success: !state.revert,
                logs,
            };
            state.receipts.insert(hash, receipt);
        }

        state.sent.push(SentTx {
            hash,
            nonce: envelope.nonce(),
            to: envelope.to(),
            challenge: call.challenge,
            signature: call.signature,
            block_number,
        });
        Ok(hash)
    }

    async fn get_transaction_receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<LedgerReceipt>> {
        Ok(self.state().receipts.get(&tx_hash).cloned())
    }
}

pub fn element() -> Arc<dyn SecureElement> {
    Arc::new(SimulatedSecureElement::from_hex(ROOT_SECRET).unwrap())
}

pub fn monitor_config(start_after_block: Option<u64>) -> MonitorConfig {
    MonitorConfig {
        poll_interval_ms: 10,
        start_after_block,
        ..Default::default()
    }
}

pub fn submission_config() -> SubmissionConfig {
    SubmissionConfig {
        receipt_timeout_secs: 1,
        receipt_poll_interval_ms: 5,
        backoff_base_ms: 1,
        backoff_max_ms: 5,
        ..Default::default()
    }
}

pub fn orchestrator(ledger: &MockLedger, start_after_block: Option<u64>) -> Orchestrator<MockLedger> {
    orchestrator_with(ledger, element(), start_after_block, submission_config())
}

pub fn orchestrator_with(
    ledger: &MockLedger,
    element: Arc<dyn SecureElement>,
    start_after_block: Option<u64>,
    submission: SubmissionConfig,
) -> Orchestrator<MockLedger> {
    let wallet = AccountWallet::from_private_key(ACCOUNT_KEY, CHAIN_ID).unwrap();
    Orchestrator::new(
        ledger.clone(),
        element,
        wallet,
        contract(),
        monitor_config(start_after_block),
        submission,
    )
}
