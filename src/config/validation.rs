//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, multipliers positive)
//! - Check that addresses, keys and URLs parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AgentConfig → Result<(), Vec<ValidationError>>
//! - `validate_runtime` adds the fields only the running agent needs, so the
//!   CLI can operate on a config that has no contract yet

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;

use crate::config::schema::{AgentConfig, SecureElementBackend};

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    /// Human readable description.
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, message: message.into() }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate everything that is present in the configuration.
pub fn validate_config(config: &AgentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = config.ledger.rpc_url.parse::<url::Url>() {
        errors.push(ValidationError::new("ledger.rpc_url", format!("invalid URL: {}", e)));
    }
    for failover in &config.ledger.failover_urls {
        if failover.parse::<url::Url>().is_err() {
            errors.push(ValidationError::new(
                "ledger.failover_urls",
                format!("invalid URL '{}'", failover),
            ));
        }
    }
    if config.ledger.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("ledger.rpc_timeout_secs", "must be greater than 0"));
    }

    if let Some(key) = &config.account.private_key {
        if key.parse::<PrivateKeySigner>().is_err() {
            errors.push(ValidationError::new("account.private_key", "not a valid private key"));
        }
    }

    if let Some(address) = &config.contract.address {
        if address.parse::<Address>().is_err() {
            errors.push(ValidationError::new(
                "contract.address",
                format!("invalid address '{}'", address),
            ));
        }
    }

    let monitor = &config.monitor;
    if monitor.poll_interval_ms == 0 {
        errors.push(ValidationError::new("monitor.poll_interval_ms", "must be greater than 0"));
    }
    if monitor.max_block_range == 0 {
        errors.push(ValidationError::new("monitor.max_block_range", "must be greater than 0"));
    }

    let submission = &config.submission;
    if submission.gas_limit < 21_000 {
        errors.push(ValidationError::new("submission.gas_limit", "must be at least 21000"));
    }
    if !(submission.gas_price_multiplier.is_finite() && submission.gas_price_multiplier > 0.0) {
        errors.push(ValidationError::new(
            "submission.gas_price_multiplier",
            "must be a positive number",
        ));
    }
    if submission.max_nonce_retries == 0 {
        errors.push(ValidationError::new("submission.max_nonce_retries", "must be at least 1"));
    }
    if submission.max_attempts == 0 {
        errors.push(ValidationError::new("submission.max_attempts", "must be at least 1"));
    }
    if submission.receipt_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "submission.receipt_timeout_secs",
            "must be greater than 0",
        ));
    }
    if submission.receipt_poll_interval_ms == 0 {
        errors.push(ValidationError::new(
            "submission.receipt_poll_interval_ms",
            "must be greater than 0",
        ));
    }
    if submission.backoff_base_ms > submission.backoff_max_ms {
        errors.push(ValidationError::new(
            "submission.backoff_base_ms",
            "must not exceed backoff_max_ms",
        ));
    }

    let se = &config.secure_element;
    match se.backend {
        SecureElementBackend::Simulated => {
            if let Some(secret) = &se.root_secret {
                if secret.parse::<PrivateKeySigner>().is_err() {
                    errors.push(ValidationError::new(
                        "secure_element.root_secret",
                        "must be a 32-byte hex secret",
                    ));
                }
            }
        }
        SecureElementBackend::Command => {
            if se.program.as_deref().map_or(true, |p| p.trim().is_empty()) {
                errors.push(ValidationError::new(
                    "secure_element.program",
                    "required for the command backend",
                ));
            }
            if se.timeout_ms == 0 {
                errors.push(ValidationError::new("secure_element.timeout_ms", "must be > 0"));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the configuration for running the challenge loop.
pub fn validate_runtime(config: &AgentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = validate_config(config).err().unwrap_or_default();

    if config.account.private_key.is_none() {
        errors.push(ValidationError::new("account.private_key", "required to submit transactions"));
    }
    if config.contract.address.is_none() {
        errors.push(ValidationError::new("contract.address", "required; deploy the contract first"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
