//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the agent.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the device verifier.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AgentConfig {
    /// Ledger RPC connection settings.
    pub ledger: LedgerConfig,

    /// The paying, on-chain authorized account.
    pub account: AccountConfig,

    /// Verifier contract location.
    pub contract: ContractConfig,

    /// Challenge event polling.
    pub monitor: MonitorConfig,

    /// Verification transaction policy.
    pub submission: SubmissionConfig,

    /// Secure element backend selection.
    pub secure_element: SecureElementConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl AgentConfig {
    /// Produce a copy of this configuration bound to a (newly deployed) contract.
    ///
    /// The running agent never mutates its configuration in place; callers
    /// persist the returned value and swap it in themselves.
    pub fn with_contract_address(&self, address: impl Into<String>) -> Self {
        let mut updated = self.clone();
        updated.contract.address = Some(address.into());
        updated
    }
}

/// Ledger RPC configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Expected chain ID. Verified at startup when set.
    pub chain_id: Option<u64>,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: None,
            rpc_timeout_secs: 10,
        }
    }
}

/// Account configuration.
#[derive(Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AccountConfig {
    /// Hex private key (with or without 0x prefix).
    ///
    /// Overridden by `VERIFIER_ACCOUNT_PRIVATE_KEY` when that is set.
    pub private_key: Option<String>,
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Contract configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ContractConfig {
    /// Verifier contract address. Unset until the contract is deployed.
    pub address: Option<String>,
}

/// Challenge monitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Polling interval in milliseconds.
    pub poll_interval_ms: u64,

    /// Treat every block up to and including this height as processed.
    /// Defaults to the chain head at startup.
    pub start_after_block: Option<u64>,

    /// Maximum number of blocks requested in one log query.
    pub max_block_range: u64,

    /// Blocks to stay behind the head before reading logs.
    pub confirmation_depth: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            start_after_block: None,
            max_block_range: 1000,
            confirmation_depth: 0,
        }
    }
}

/// Verification transaction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// Gas limit for the verification call.
    pub gas_limit: u64,

    /// Gas price multiplier (1.0 = node estimate, 1.2 = 20% buffer).
    pub gas_price_multiplier: f64,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,

    /// Broadcast attempts on nonce conflicts within one submission.
    pub max_nonce_retries: u32,

    /// Whole-submission attempts for recoverable failures.
    pub max_attempts: u32,

    /// Time to wait for a receipt, in seconds.
    pub receipt_timeout_secs: u64,

    /// Receipt polling interval in milliseconds.
    pub receipt_poll_interval_ms: u64,

    /// Base delay for retry backoff in milliseconds.
    pub backoff_base_ms: u64,

    /// Maximum delay for retry backoff in milliseconds.
    pub backoff_max_ms: u64,

    /// Number of submission records kept for the operator.
    pub history_limit: usize,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            gas_limit: 200_000,
            gas_price_multiplier: 1.0,
            max_gas_price_gwei: 500,
            max_nonce_retries: 3,
            max_attempts: 3,
            receipt_timeout_secs: 60,
            receipt_poll_interval_ms: 1000,
            backoff_base_ms: 500,
            backoff_max_ms: 30_000,
            history_limit: 100,
        }
    }
}

/// Secure element backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SecureElementBackend {
    /// In-process software simulation.
    #[default]
    Simulated,
    /// External helper program talking to the hardware.
    Command,
}

/// Secure element configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecureElementConfig {
    /// Which implementation to construct.
    pub backend: SecureElementBackend,

    /// Simulated root secret (hex). A fresh one is generated when unset.
    pub root_secret: Option<String>,

    /// Helper program for the command backend.
    pub program: Option<String>,

    /// Extra arguments passed before the operation name.
    pub args: Vec<String>,

    /// Deadline for one helper invocation; the helper is killed on expiry.
    pub timeout_ms: u64,
}

impl Default for SecureElementConfig {
    fn default() -> Self {
        Self {
            backend: SecureElementBackend::Simulated,
            root_secret: None,
            program: None,
            args: Vec::new(),
            timeout_ms: 10_000,
        }
    }
}

impl std::fmt::Debug for SecureElementConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureElementConfig")
            .field("backend", &self.backend)
            .field("root_secret", &self.root_secret.as_ref().map(|_| "<redacted>"))
            .field("program", &self.program)
            .field("args", &self.args)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml() {
        let config: AgentConfig = toml::from_str(
            r#"
            [ledger]
            rpc_url = "https://sepolia.base.org"

            [contract]
            address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
            "#,
        )
        .unwrap();

        assert_eq!(config.ledger.rpc_url, "https://sepolia.base.org");
        assert_eq!(config.ledger.rpc_timeout_secs, 10);
        assert_eq!(config.monitor.poll_interval_ms, 1000);
        assert_eq!(config.submission.gas_limit, 200_000);
        assert_eq!(config.secure_element.backend, SecureElementBackend::Simulated);
        assert!(config.account.private_key.is_none());
    }

    #[test]
    fn test_command_backend_parses() {
        let config: AgentConfig = toml::from_str(
            r#"
            [secure_element]
            backend = "command"
            program = "/usr/bin/se-helper"
            args = ["--slot", "0"]
            "#,
        )
        .unwrap();

        assert_eq!(config.secure_element.backend, SecureElementBackend::Command);
        assert_eq!(config.secure_element.args, vec!["--slot", "0"]);
        assert_eq!(config.secure_element.timeout_ms, 10_000);
    }

    #[test]
    fn test_with_contract_address_leaves_original() {
        let config = AgentConfig::default();
        let updated = config.with_contract_address("0xabc");

        assert!(config.contract.address.is_none());
        assert_eq!(updated.contract.address.as_deref(), Some("0xabc"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = AgentConfig::default();
        config.account.private_key = Some("deadbeef".into());
        config.secure_element.root_secret = Some("cafebabe".into());

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("deadbeef"));
        assert!(!rendered.contains("cafebabe"));
    }
}
