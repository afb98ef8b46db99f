//! Device signing identity.
//!
//! # Data Flow
//! ```text
//! challenge
//!     → derive.rs (secure element signs under the fixed scheme → 32-byte seed)
//!     → signer.rs (seed → ephemeral secp256k1 key → personal-message signature)
//!     → ChallengeSignature (65 bytes, r || s || v)
//! ```
//!
//! # Security Notes
//! - The per-challenge key lives only for one `sign` call
//! - The seed is a function of the secure element's signature over the
//!   challenge; anyone who learns that signature can recompute the key

pub mod derive;
pub mod signer;

pub use derive::{derive_seed, DerivedSeed, SEED_LEN};
pub use signer::{ChallengeSignature, ChallengeSigner, SigningError, SIGNATURE_LEN};
