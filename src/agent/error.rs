//! Agent error taxonomy.

use thiserror::Error;

use crate::blockchain::{BlockchainError, SubmissionError};
use crate::identity::SigningError;
use crate::monitor::LogDecodeError;

/// Every failure the challenge loop can surface.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Missing or inconsistent configuration. Fatal.
    #[error("configuration error: {0}")]
    Config(String),

    /// Ledger unreachable or timing out. Recoverable once running.
    #[error("connectivity error: {0}")]
    Connectivity(#[source] BlockchainError),

    /// A challenge log could not be decoded. Skipped.
    #[error("log decode error: {0}")]
    LogDecode(#[from] LogDecodeError),

    /// The challenge could not be signed. Fatal when the secure element
    /// reports a permanent failure.
    #[error("signing error: {0}")]
    Signing(#[from] SigningError),

    /// The verification transaction failed after its retries.
    #[error("submission error: {0}")]
    Submission(#[source] SubmissionError),

    /// The account cannot pay for gas. Fatal.
    #[error("insufficient balance: {0}")]
    InsufficientBalance(#[source] SubmissionError),
}

impl AgentError {
    /// True when the loop must stop.
    pub fn is_fatal(&self) -> bool {
        match self {
            AgentError::Config(_) | AgentError::InsufficientBalance(_) => true,
            AgentError::Signing(e) => e.is_permanent(),
            AgentError::Connectivity(_) | AgentError::LogDecode(_) | AgentError::Submission(_) => false,
        }
    }
}

impl From<SubmissionError> for AgentError {
    fn from(e: SubmissionError) -> Self {
        if e.is_insufficient_balance() {
            AgentError::InsufficientBalance(e)
        } else {
            AgentError::Submission(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secure_element::SecureElementError;
    use alloy::primitives::U256;

    #[test]
    fn test_fatality() {
        assert!(AgentError::Config("missing contract".into()).is_fatal());
        assert!(!AgentError::Connectivity(BlockchainError::Timeout(5)).is_fatal());
        assert!(!AgentError::LogDecode(LogDecodeError::MissingPosition).is_fatal());

        let transient = SigningError::SecureElement(SecureElementError::Transient("busy".into()));
        assert!(!AgentError::from(transient).is_fatal());
        let permanent = SigningError::SecureElement(SecureElementError::Permanent("fused".into()));
        assert!(AgentError::from(permanent).is_fatal());
    }

    #[test]
    fn test_submission_mapping() {
        let err = AgentError::from(SubmissionError::InsufficientBalance {
            balance: U256::ZERO,
            required: U256::from(1u64),
        });
        assert!(matches!(err, AgentError::InsufficientBalance(_)));
        assert!(err.is_fatal());

        let err = AgentError::from(SubmissionError::NonceExhausted { attempts: 3 });
        assert!(matches!(err, AgentError::Submission(_)));
        assert!(!err.is_fatal());
    }
}
