//! ABI bindings for the device verifier contract.

use alloy::sol;

sol! {
    /// Emitted when the contract issues a new challenge to the device.
    #[derive(Debug, PartialEq, Eq)]
    event ChallengeGenerated(bytes challenge);

    /// Emitted when a submitted response has been checked.
    #[derive(Debug, PartialEq, Eq)]
    event ChallengeVerified(bytes challenge, bool isValid);

    /// Verify the device's signature over an outstanding challenge.
    #[derive(Debug, PartialEq, Eq)]
    function verifyChallenge(bytes challenge, bytes signature) external returns (bool);
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{keccak256, Bytes};
    use alloy::sol_types::{SolCall, SolEvent};

    #[test]
    fn test_event_signature() {
        assert_eq!(ChallengeGenerated::SIGNATURE, "ChallengeGenerated(bytes)");
        assert_eq!(
            ChallengeGenerated::SIGNATURE_HASH,
            keccak256("ChallengeGenerated(bytes)")
        );
    }

    #[test]
    fn test_verify_call_selector() {
        let call = verifyChallengeCall {
            challenge: Bytes::from(vec![0xaa; 32]),
            signature: Bytes::from(vec![0x11; 65]),
        };
        let data = call.abi_encode();
        assert_eq!(&data[..4], &keccak256("verifyChallenge(bytes,bytes)")[..4]);

        let decoded = verifyChallengeCall::abi_decode(&data).unwrap();
        assert_eq!(decoded.signature.len(), 65);
    }
}
