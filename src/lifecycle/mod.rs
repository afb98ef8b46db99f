//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → every subscribed loop sees the signal at its next
//!     suspension point → loop returns
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//! ```
//!
//! # Design Decisions
//! - Shutdown interrupts the loop at its next suspension point, including
//!   mid-tick; the cursor only moves after a completed batch, so an
//!   interrupted batch is redone on restart
//! - Tests drive shutdown directly instead of sending OS signals

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_on_signal;
