//! Device agent.
//!
//! # Data Flow
//! ```text
//! ChainWatcher::poll(cursor)
//!     → ChallengeEvent (block, log index order)
//!     → ChallengeSigner::sign (secure-element-derived identity)
//!     → TransactionSubmitter::submit (verifyChallenge, nonce retry, receipt)
//!     → SubmissionRecord
//!     → cursor advanced once the batch is handled
//! ```

pub mod error;
pub mod orchestrator;
pub mod record;
pub mod state;

pub use error::AgentError;
pub use orchestrator::Orchestrator;
pub use record::{EventFailure, SubmissionRecord, TickReport};
pub use state::AgentState;
