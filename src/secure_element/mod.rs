//! Secure element capability.
//!
//! # Data Flow
//! ```text
//! SecureElementConfig
//!     → from_config() picks one backend
//!         → simulated.rs (in-process software key)
//!         → command.rs (external helper program fronting the hardware)
//!     → Arc<dyn SecureElement> injected into the agent
//! ```
//!
//! # Design Decisions
//! - Backend is chosen by configuration, never by inspecting the host
//! - The root key never leaves the element; only `sign` and `public_key` exist
//! - Errors distinguish transient faults (retry) from permanent ones (stop)

pub mod command;
pub mod simulated;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::{SecureElementBackend, SecureElementConfig};

pub use command::CommandSecureElement;
pub use simulated::SimulatedSecureElement;

/// Signature padding applied by the element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaddingScheme {
    /// Deterministic PKCS#1 v1.5 padding.
    Pkcs1v15,
    /// Probabilistic PSS padding with maximum salt length.
    Pss,
}

impl PaddingScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaddingScheme::Pkcs1v15 => "pkcs1v15",
            PaddingScheme::Pss => "pss",
        }
    }
}

/// Digest applied to the message before signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha256,
    Keccak256,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Keccak256 => "keccak256",
        }
    }
}

/// Padding and hash used for one signing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignScheme {
    pub padding: PaddingScheme,
    pub hash: HashAlgorithm,
}

impl SignScheme {
    /// The fixed scheme used for key derivation.
    ///
    /// Must be deterministic: the same challenge has to derive the same key.
    pub const DERIVATION: SignScheme = SignScheme {
        padding: PaddingScheme::Pkcs1v15,
        hash: HashAlgorithm::Sha256,
    };
}

impl std::fmt::Display for SignScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.padding.as_str(), self.hash.as_str())
    }
}

/// Errors reported by a secure element.
#[derive(Debug, Error)]
pub enum SecureElementError {
    /// The element is busy or briefly unavailable; the operation may be retried.
    #[error("secure element temporarily unavailable: {0}")]
    Transient(String),

    /// The element cannot perform the operation, now or later.
    #[error("secure element failure: {0}")]
    Permanent(String),
}

impl SecureElementError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, SecureElementError::Permanent(_))
    }
}

/// Hardware-anchored signing capability.
pub trait SecureElement: Send + Sync {
    /// Sign `message` with the element's root key.
    fn sign(&self, message: &[u8], scheme: SignScheme) -> Result<Vec<u8>, SecureElementError>;

    /// Encoded public half of the root key, registered on-chain at deployment.
    fn public_key(&self) -> Result<Vec<u8>, SecureElementError>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

/// Construct the secure element selected by configuration.
pub fn from_config(config: &SecureElementConfig) -> Result<Arc<dyn SecureElement>, SecureElementError> {
    let element: Arc<dyn SecureElement> = match config.backend {
        SecureElementBackend::Simulated => match &config.root_secret {
            Some(secret) => Arc::new(SimulatedSecureElement::from_hex(secret)?),
            None => {
                tracing::warn!("No simulated root secret configured, generating an ephemeral one");
                Arc::new(SimulatedSecureElement::random())
            }
        },
        SecureElementBackend::Command => {
            let program = config.program.clone().ok_or_else(|| {
                SecureElementError::Permanent("command backend requires a program".to_string())
            })?;
            Arc::new(
                CommandSecureElement::new(program, config.args.clone())
                    .with_timeout(Duration::from_millis(config.timeout_ms)),
            )
        }
    };

    tracing::info!(backend = element.name(), "Secure element initialized");
    Ok(element)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_display() {
        assert_eq!(SignScheme::DERIVATION.to_string(), "pkcs1v15/sha256");
    }

    #[test]
    fn test_from_config_simulated() {
        let config = SecureElementConfig {
            root_secret: Some(
                "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d".into(),
            ),
            ..Default::default()
        };
        let element = from_config(&config).unwrap();
        assert_eq!(element.name(), "simulated");
    }

    #[test]
    fn test_from_config_command_without_program() {
        let config = SecureElementConfig {
            backend: SecureElementBackend::Command,
            ..Default::default()
        };
        let err = from_config(&config).err().unwrap();
        assert!(err.is_permanent());
    }
}
