//! Software secure element for development and tests.
//!
//! Holds a secp256k1 root key in process memory. Signatures are RFC 6979
//! deterministic ECDSA over `keccak256(scheme || message)`, so the padding
//! and hash selection changes the output without emulating RSA padding.

use alloy::primitives::keccak256;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;

use crate::secure_element::{SecureElement, SecureElementError, SignScheme};

pub struct SimulatedSecureElement {
    root: PrivateKeySigner,
}

impl SimulatedSecureElement {
    /// Simulated element with a fresh random root key.
    pub fn random() -> Self {
        Self {
            root: PrivateKeySigner::random(),
        }
    }

    /// Simulated element with a fixed root key (hex, with or without 0x).
    pub fn from_hex(secret: &str) -> Result<Self, SecureElementError> {
        let root = secret
            .trim()
            .parse::<PrivateKeySigner>()
            .map_err(|e| SecureElementError::Permanent(format!("invalid root secret: {}", e)))?;
        Ok(Self { root })
    }
}

impl SecureElement for SimulatedSecureElement {
    fn sign(&self, message: &[u8], scheme: SignScheme) -> Result<Vec<u8>, SecureElementError> {
        let mut preimage = scheme.to_string().into_bytes();
        preimage.extend_from_slice(message);

        let signature = self
            .root
            .sign_hash_sync(&keccak256(&preimage))
            .map_err(|e| SecureElementError::Permanent(format!("signing failed: {}", e)))?;

        Ok(signature.as_bytes().to_vec())
    }

    fn public_key(&self) -> Result<Vec<u8>, SecureElementError> {
        let point = self.root.credential().verifying_key().to_encoded_point(false);
        Ok(point.as_bytes().to_vec())
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

impl std::fmt::Debug for SimulatedSecureElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedSecureElement").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secure_element::{HashAlgorithm, PaddingScheme};

    const ROOT: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    #[test]
    fn test_sign_is_deterministic() {
        let element = SimulatedSecureElement::from_hex(ROOT).unwrap();
        let a = element.sign(&[0xaa; 32], SignScheme::DERIVATION).unwrap();
        let b = element.sign(&[0xaa; 32], SignScheme::DERIVATION).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 65);
    }

    #[test]
    fn test_scheme_changes_output() {
        let element = SimulatedSecureElement::from_hex(ROOT).unwrap();
        let pss = SignScheme {
            padding: PaddingScheme::Pss,
            hash: HashAlgorithm::Sha256,
        };
        let a = element.sign(b"challenge", SignScheme::DERIVATION).unwrap();
        let b = element.sign(b"challenge", pss).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_distinct_roots_disagree() {
        let a = SimulatedSecureElement::from_hex(ROOT).unwrap();
        let b = SimulatedSecureElement::random();
        assert_ne!(
            a.sign(b"challenge", SignScheme::DERIVATION).unwrap(),
            b.sign(b"challenge", SignScheme::DERIVATION).unwrap()
        );
    }

    #[test]
    fn test_public_key_is_uncompressed_point() {
        let element = SimulatedSecureElement::from_hex(ROOT).unwrap();
        let key = element.public_key().unwrap();
        assert_eq!(key.len(), 65);
        assert_eq!(key[0], 0x04);
    }

    #[test]
    fn test_invalid_root_secret() {
        let err = SimulatedSecureElement::from_hex("zz").unwrap_err();
        assert!(err.is_permanent());
    }
}
