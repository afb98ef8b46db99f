//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Recoverable fault in the challenge loop:
//!     → backoff.rs (delay grows with consecutive failures, capped, jittered)
//!     → loop sleeps, then returns to monitoring
//! ```
//!
//! # Design Decisions
//! - Timeouts live with each RPC call (blockchain::client)
//! - Retries are bounded; exhausted retries are surfaced, never dropped

pub mod backoff;

pub use backoff::{calculate_backoff, Backoff};
