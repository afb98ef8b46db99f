//! Device verifier agent library

pub mod agent;
pub mod blockchain;
pub mod config;
pub mod identity;
pub mod lifecycle;
pub mod monitor;
pub mod observability;
pub mod resilience;
pub mod secure_element;

pub use agent::Orchestrator;
pub use config::AgentConfig;
pub use lifecycle::Shutdown;
