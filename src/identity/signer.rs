//! Challenge signing with an ephemeral, secure-element-derived identity.

use alloy::primitives::{hex, Address, Bytes};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use std::sync::Arc;
use thiserror::Error;

use crate::identity::derive::derive_seed;
use crate::secure_element::{SecureElement, SecureElementError};

/// Length of a compact `r || s || v` signature.
pub const SIGNATURE_LEN: usize = 65;

/// Errors that can occur while signing a challenge.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The secure element failed.
    #[error(transparent)]
    SecureElement(#[from] SecureElementError),

    /// The derived seed is not a usable secp256k1 scalar.
    #[error("derived seed is not a valid signing key: {0}")]
    InvalidSeed(String),

    /// Signing with the derived identity failed.
    #[error("challenge signing failed: {0}")]
    Signer(String),
}

impl SigningError {
    /// True when retrying cannot help.
    pub fn is_permanent(&self) -> bool {
        match self {
            SigningError::SecureElement(e) => e.is_permanent(),
            SigningError::InvalidSeed(_) | SigningError::Signer(_) => false,
        }
    }
}

/// A 65-byte `r || s || v` signature over a challenge.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ChallengeSignature([u8; SIGNATURE_LEN]);

impl ChallengeSignature {
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.0)
    }
}

impl std::fmt::Debug for ChallengeSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChallengeSignature({})", hex::encode_prefixed(self.0))
    }
}

/// Signs challenges with an identity derived per challenge from the secure element.
#[derive(Clone)]
pub struct ChallengeSigner {
    element: Arc<dyn SecureElement>,
}

impl ChallengeSigner {
    pub fn new(element: Arc<dyn SecureElement>) -> Self {
        Self { element }
    }

    /// Sign `challenge` as an Ethereum personal message
    /// (`"\x19Ethereum Signed Message:\n" || len || challenge`).
    ///
    /// Deterministic for a given challenge and secure element state, so a
    /// retried submission carries the same signature.
    pub fn sign(&self, challenge: &[u8]) -> Result<ChallengeSignature, SigningError> {
        let identity = self.identity(challenge)?;

        let signature = identity
            .sign_message_sync(challenge)
            .map_err(|e| SigningError::Signer(e.to_string()))?;

        // The identity is dropped here; it is never stored or logged.
        Ok(ChallengeSignature(signature.as_bytes()))
    }

    /// Address of the identity that signs `challenge`.
    pub fn signer_address(&self, challenge: &[u8]) -> Result<Address, SigningError> {
        Ok(self.identity(challenge)?.address())
    }

    fn identity(&self, challenge: &[u8]) -> Result<PrivateKeySigner, SigningError> {
        let seed = derive_seed(self.element.as_ref(), challenge)?;
        PrivateKeySigner::from_bytes(&seed.to_b256())
            .map_err(|e| SigningError::InvalidSeed(e.to_string()))
    }
}

impl std::fmt::Debug for ChallengeSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChallengeSigner")
            .field("element", &self.element.name())
            .finish()
    }
}
