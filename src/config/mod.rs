//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + VERIFIER_ACCOUNT_PRIVATE_KEY
//!     → loader.rs (parse, deserialize, normalize key)
//!     → validation.rs (semantic checks)
//!     → AgentConfig (validated, immutable)
//!     → handed by value to each subsystem at construction
//!
//! On contract deployment (operator CLI):
//!     AgentConfig::with_contract_address → save_config → restart agent
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; updates produce a new value
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, save_config, ConfigError};
pub use schema::AgentConfig;
pub use schema::LedgerConfig;
pub use schema::MonitorConfig;
pub use schema::ObservabilityConfig;
pub use schema::SecureElementBackend;
pub use schema::SecureElementConfig;
pub use schema::SubmissionConfig;
