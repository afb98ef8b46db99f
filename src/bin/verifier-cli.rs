use std::path::PathBuf;

use alloy::primitives::{hex, Address, Bytes};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use device_verifier::blockchain::{AccountWallet, BlockchainClient};
use device_verifier::config::{load_config, save_config, AgentConfig};
use device_verifier::identity::ChallengeSigner;
use device_verifier::observability::logging;
use device_verifier::secure_element;

#[derive(Parser)]
#[command(name = "verifier-cli")]
#[command(about = "Operator CLI for the device verifier agent", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "verifier.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the secure element's public key for contract deployment
    PublicKey,
    /// Sign a hex challenge locally, without touching the ledger
    Sign {
        /// Challenge bytes as hex
        challenge: String,
    },
    /// Show chain, account and contract status
    Status,
    /// Point the configuration at a newly deployed contract
    SetContract {
        /// Contract address
        address: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    logging::init_logging("warn");

    match cli.command {
        Commands::PublicKey => {
            let element = secure_element::from_config(&config.secure_element)?;
            let public_key = element.public_key()?;
            print_json(&json!({
                "backend": element.name(),
                "public_key": hex::encode_prefixed(public_key),
            }))?;
        }
        Commands::Sign { challenge } => {
            let challenge = Bytes::from(hex::decode(challenge.trim())?);
            let element = secure_element::from_config(&config.secure_element)?;
            let signer = ChallengeSigner::new(element);
            let signature = signer.sign(&challenge)?;
            print_json(&json!({
                "challenge": challenge,
                "signer": signer.signer_address(&challenge)?,
                "signature": signature.to_bytes(),
            }))?;
        }
        Commands::Status => {
            print_json(&status(&config).await?)?;
        }
        Commands::SetContract { address } => {
            let address: Address = address.parse()?;
            let updated = config.with_contract_address(address.to_checksum(None));
            save_config(&cli.config, &updated)?;
            print_json(&json!({
                "config": cli.config.display().to_string(),
                "contract": address,
            }))?;
        }
    }

    Ok(())
}

async fn status(config: &AgentConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let client = BlockchainClient::new(config.ledger.clone())?;

    if !client.is_healthy().await {
        return Ok(json!({
            "rpc_url": config.ledger.rpc_url,
            "reachable": false,
        }));
    }

    let chain_id = client.verify_chain_id().await?;
    let head = client.get_block_number().await?;

    let account = match config.account.private_key.as_deref() {
        Some(key) => {
            let wallet = AccountWallet::from_private_key(key, chain_id.into())?;
            let address = wallet.address();
            json!({
                "address": address,
                "balance_wei": client.get_balance(address).await?.to_string(),
                "nonce": client.get_transaction_count(address).await?,
            })
        }
        None => Value::Null,
    };

    Ok(json!({
        "rpc_url": config.ledger.rpc_url,
        "reachable": true,
        "chain_id": chain_id.0,
        "head_block": head,
        "account": account,
        "contract": config.contract.address,
        "secure_element": config.secure_element.backend,
    }))
}

fn print_json(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
