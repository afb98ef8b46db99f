//! Device verifier agent
//!
//! Answers on-chain challenges with signatures from an identity derived,
//! per challenge, from a hardware secure element.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────┐
//!                         │                  DEVICE AGENT                     │
//!                         │                                                   │
//!   ChallengeGenerated    │  ┌─────────┐    ┌──────────┐    ┌─────────────┐  │
//!   ──────────────────────┼─▶│ monitor │───▶│  agent   │───▶│  identity   │  │
//!   (ledger logs)         │  │ watcher │    │orchestr. │    │   signer    │  │
//!                         │  └─────────┘    └────┬─────┘    └──────┬──────┘  │
//!                         │                      │                 │         │
//!                         │                      ▼                 ▼         │
//!   verifyChallenge tx    │               ┌─────────────┐  ┌──────────────┐  │
//!   ◀─────────────────────┼───────────────│ blockchain  │  │secure_element│  │
//!                         │               │  submitter  │  │ sim/command  │  │
//!                         │               └─────────────┘  └──────────────┘  │
//!                         │                                                   │
//!                         │  config · observability · resilience · lifecycle  │
//!                         └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use alloy::primitives::Address;
use clap::Parser;

use device_verifier::agent::Orchestrator;
use device_verifier::blockchain::{AccountWallet, BlockchainClient};
use device_verifier::config::load_config;
use device_verifier::config::validation::validate_runtime;
use device_verifier::config::ConfigError;
use device_verifier::lifecycle::{shutdown_on_signal, Shutdown};
use device_verifier::observability::{logging, metrics};
use device_verifier::secure_element;

#[derive(Parser)]
#[command(name = "device-verifier")]
#[command(about = "Answers on-chain device challenges with secure-element-backed signatures", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "verifier.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(&args.config)?;
    validate_runtime(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability.log_level);

    tracing::info!("device-verifier v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let element = secure_element::from_config(&config.secure_element)?;

    let client = BlockchainClient::new(config.ledger.clone())?;
    let chain_id = client.verify_chain_id().await?;

    // validate_runtime guarantees both are present and well-formed.
    let private_key = config.account.private_key.as_deref().unwrap_or_default();
    let contract: Address = config.contract.address.as_deref().unwrap_or_default().parse()?;

    let wallet = AccountWallet::from_private_key(private_key, chain_id.into())?;

    tracing::info!(
        rpc_url = %config.ledger.rpc_url,
        chain_id = chain_id.0,
        account = %wallet.address(),
        contract = %contract,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    let mut agent = Orchestrator::new(
        client,
        element,
        wallet,
        contract,
        config.monitor.clone(),
        config.submission.clone(),
    );

    agent.run(shutdown.subscribe()).await?;

    tracing::info!(cursor = %agent.cursor(), "Shutdown complete");
    Ok(())
}
