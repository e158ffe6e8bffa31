use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use smartwallet::{Bootstrap, BootstrapConfig, Config};
use smartwallet_account_abstraction::Bootloader;
use smartwallet_core::{SignatureEnvelope, Transaction};
use smartwallet_crypto::{address_of, generate_private_key, R1SigningKey};
use smartwallet_types::{Address, Bytes, U256};

#[derive(Parser)]
#[command(name = "smartwallet")]
#[command(about = "Modular smart-contract wallet authorization engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    
    /// Configuration file (defaults to the per-user config, then built-in defaults)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    
    /// Network preset used when no configuration file is found
    #[arg(short, long, global = true, default_value = "local")]
    network: String,
    
    /// Overrides the configured log level
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an owner key pair
    Keygen {
        #[arg(long, value_enum, default_value = "r1")]
        curve: Curve,
    },
    
    /// Print the EIP-712 digest a transaction's signature must cover
    Digest {
        /// Transaction as JSON, or a path to a JSON file
        #[arg(long)]
        tx: String,
    },
    
    /// Write a configuration file for a network preset
    InitConfig {
        /// Output path
        #[arg(short, long)]
        output: PathBuf,
    },
    
    /// Bootstrap an in-memory world and process a signed transfer
    Demo {
        /// Bootstrap JSON file
        #[arg(short, long)]
        bootstrap: Option<PathBuf>,
        
        /// Recipient of the demo transfer
        #[arg(long, default_value = "0x000000000000000000000000000000000000beef")]
        to: Address,
        
        /// Amount in wei
        #[arg(long, default_value_t = 1000)]
        value: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Curve {
    R1,
    K1,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    
    // Initialize logging
    let level = cli.log_level.clone().unwrap_or_else(|| config.log.level.clone());
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&level));
    
    if config.log.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .init();
    }
    
    match cli.command {
        Commands::Keygen { curve } => keygen(curve),
        Commands::Digest { tx } => digest(&config, &tx),
        Commands::InitConfig { output } => {
            config.to_file(&output)?;
            info!("Configuration written to {}", output.display());
            Ok(())
        }
        Commands::Demo { bootstrap, to, value } => demo(&config, bootstrap, to, value),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match (&cli.config, Config::default_path()) {
        (Some(path), _) => Config::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        (None, Some(path)) if path.exists() => Config::from_file(&path)?,
        _ => Config::for_network(&cli.network)?,
    };
    config.apply_env()?;
    Ok(config)
}

fn keygen(curve: Curve) -> Result<()> {
    let output = match curve {
        Curve::R1 => {
            let key = R1SigningKey::random();
            json!({
                "curve": "r1",
                "privateKey": format!("0x{}", hex::encode(key.to_bytes())),
                "publicKey": format!("0x{}", hex::encode(key.public_key().as_bytes())),
            })
        }
        Curve::K1 => {
            let key = generate_private_key();
            json!({
                "curve": "k1",
                "privateKey": format!("0x{}", hex::encode(key.secret_bytes())),
                "address": format!("{:x}", address_of(&key)),
            })
        }
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn digest(config: &Config, tx: &str) -> Result<()> {
    let json = if tx.trim_start().starts_with('{') {
        tx.to_string()
    } else {
        std::fs::read_to_string(tx).context("Failed to read transaction file")?
    };
    let tx: Transaction = serde_json::from_str(&json)
        .context("Failed to parse transaction")?;
    
    let chain_id = config.chain.chain_id;
    println!("{}", serde_json::to_string_pretty(&json!({
        "chainId": chain_id,
        "signingHash": tx.signing_hash(chain_id),
        "txHash": tx.hash(chain_id),
    }))?);
    Ok(())
}

fn demo(config: &Config, bootstrap: Option<PathBuf>, to: Address, value: u64) -> Result<()> {
    let bootstrap = match bootstrap {
        Some(path) => Bootstrap::from_file(path)?,
        None => Bootstrap::new(BootstrapConfig::default()),
    };
    let account = bootstrap
        .config()
        .accounts
        .iter()
        .find(|a| a.r1_owner.is_none())
        .map(|a| a.address)
        .context("Bootstrap has no account owned by the demo signer")?;
    
    let signer = R1SigningKey::random();
    let mut host = bootstrap.build(config, &signer)?;
    info!(%account, "world bootstrapped");
    
    let tx = Transaction::new(account, to, U256::from(value), Bytes::new(), 0);
    let signature = signer.sign_hash(&tx.signing_hash(config.chain.chain_id))?;
    let envelope = SignatureEnvelope::new(signature.to_vec(), config.account.r1_validator, vec![]);
    let tx = tx.with_signature(envelope.encode());
    
    let receipt = Bootloader::process_transaction(&mut host, &tx)?;
    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(())
}
