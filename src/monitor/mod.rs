//! Challenge monitoring module.
//!
//! # Data Flow
//! ```text
//! Cursor (last fully handled block)
//!     → watcher.rs (head height, getLogs over (cursor, head], decode)
//!     → PollBatch { ordered events, decode errors, next cursor }
//!     → agent (handles events, then advances the cursor)
//! ```

pub mod types;
pub mod watcher;

pub use types::{ChallengeEvent, Cursor, LogDecodeError, PollBatch};
pub use watcher::ChainWatcher;
