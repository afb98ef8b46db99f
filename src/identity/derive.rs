//! Signing seed derivation from secure element output.

use alloy::primitives::B256;

use crate::secure_element::{SecureElement, SecureElementError, SignScheme};

/// Length of a derived seed in bytes.
pub const SEED_LEN: usize = 32;

/// 32-byte secret seed for one challenge's signing identity.
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedSeed([u8; SEED_LEN]);

impl DerivedSeed {
    /// Seed from raw secure element output: the first 32 bytes, left-padded
    /// with zeros when the output is shorter.
    pub fn from_signature(signature: &[u8]) -> Self {
        let mut seed = [0u8; SEED_LEN];
        if signature.len() >= SEED_LEN {
            seed.copy_from_slice(&signature[..SEED_LEN]);
        } else {
            seed[SEED_LEN - signature.len()..].copy_from_slice(signature);
        }
        Self(seed)
    }

    pub fn as_bytes(&self) -> &[u8; SEED_LEN] {
        &self.0
    }

    pub fn to_b256(&self) -> B256 {
        B256::from(self.0)
    }
}

impl std::fmt::Debug for DerivedSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedSeed(<redacted>)")
    }
}

/// Derive the signing seed for `challenge`.
///
/// Asks the element to sign the challenge under the fixed derivation scheme
/// and keeps the leading bytes of the result.
pub fn derive_seed(
    element: &dyn SecureElement,
    challenge: &[u8],
) -> Result<DerivedSeed, SecureElementError> {
    let signature = element.sign(challenge, SignScheme::DERIVATION)?;
    if signature.len() < SEED_LEN {
        tracing::debug!(
            len = signature.len(),
            "Secure element output shorter than seed, left-padding"
        );
    }
    Ok(DerivedSeed::from_signature(&signature))
}
