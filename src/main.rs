//! Token Reward Bot
//!
//! Pays a fixed token reward when `POST /distribute` is called.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TOKEN REWARD BOT                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  HTTP API (5000)        ←── /ping, /distribute, /metrics    │
//! │  Distributor            ←── filters recipients, one run at  │
//! │                             a time                          │
//! │  Transfer executor      ←── native: sign + broadcast (node) │
//! │                             gateway: find + transfer (RPC)  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Configuration comes from the environment (`HIVE_ACCOUNT_NAME`,
//! `HIVE_ACTIVE_KEY`, `HIVE_POSTING_KEY`, ...), optionally seeded from a TOML
//! file. A `.env` file in the working directory (or a parent) is read first;
//! variables already exported take precedence over it. The bot refuses to
//! start without the account and both keys.

use clap::Parser;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, warn};

mod api;
mod config;
mod crypto;
mod distribution;
mod rpc;
mod transfer;
mod types;

#[cfg(test)]
mod test_support;

use api::{ApiState, Metrics};
use config::{BotConfig, TransferMode};
use distribution::{Distributor, RecipientSource};
use rpc::RpcClient;
use transfer::{GatewayExecutor, NativeExecutor};
use types::Authority;

/// Token Reward Bot - HTTP-triggered reward distribution
#[derive(Parser, Debug)]
#[command(name = "reward-bot")]
#[command(author = "Reward Bot Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Distributes token rewards to delegators on demand", long_about = None)]
struct Args {
    /// Path to optional configuration file
    #[arg(short, long, default_value = "reward-bot.toml")]
    config: PathBuf,

    /// HTTP listen port
    #[arg(long)]
    listen_port: Option<u16>,

    /// Transfer mechanism (native, gateway)
    #[arg(long, env = "TRANSFER_MODE")]
    mode: Option<TransferMode>,

    /// Log file (appended to)
    #[arg(long)]
    log_file: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "BOT_LOG")]
    log_level: String,

    /// Generate a new authority key and exit
    #[arg(long)]
    generate_key: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before clap so `TRANSFER_MODE` and `BOT_LOG` can come from `.env` too
    let dotenv = dotenvy::dotenv();
    let args = Args::parse();

    if args.generate_key {
        let (secret, public) = crypto::generate_secret();
        println!("secret: {}", secret);
        println!("public: {}", public);
        return Ok(());
    }

    // Load configuration
    let config = if args.config.exists() {
        BotConfig::load(&args.config)?
    } else {
        BotConfig::default()
    };

    let config = config
        .apply_env(|var| std::env::var(var).ok())?
        .with_listen_port(args.listen_port)
        .with_transfer_mode(args.mode)
        .with_log_file(args.log_file);

    init_logging(&args.log_level, &config.log_file);

    info!("🤖 Token Reward Bot v{}", env!("CARGO_PKG_VERSION"));

    match &dotenv {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Ignoring .env file: {}", e),
    }

    if let Err(e) = config.validate() {
        error!("{}", e);
        return Err(e.into());
    }

    let keys = config.authority_keys()?;

    info!("⚙️  Configuration:");
    info!("   Account: {}", config.account_name);
    info!("   Active key: {}", hex::encode(keys.public_key(Authority::Active)));
    info!("   Posting key: {}", hex::encode(keys.public_key(Authority::Posting)));
    info!("   Token: {}", config.token_symbol);
    info!("   Reward: {} (minimum balance {})", config.reward_amount, config.minimum_balance);
    info!("   Mode: {}", config.transfer_mode);

    let shared_config = Arc::new(config);
    let metrics = Arc::new(Metrics::new());
    let timeout = Duration::from_secs(shared_config.rpc_timeout_secs);

    let distributor = match shared_config.transfer_mode {
        TransferMode::Native => {
            let rpc = RpcClient::new(&shared_config.node_rpc_url, timeout)?;
            info!("   Node RPC: {}", rpc.url());

            let executor = Arc::new(NativeExecutor::new(
                rpc,
                &shared_config.account_name,
                keys,
                shared_config.token_precision,
            ));
            Distributor::new(
                shared_config.clone(),
                executor.clone(),
                RecipientSource::Delegators(executor),
                metrics.clone(),
            )
        }
        TransferMode::Gateway => {
            let rpc = RpcClient::new(&shared_config.gateway_rpc_url, timeout)?;
            info!("   Gateway RPC: {}", rpc.url());

            let executor = Arc::new(GatewayExecutor::new(
                rpc,
                &shared_config.account_name,
                &shared_config.gateway_contract,
                shared_config.token_precision,
            ));
            Distributor::new(
                shared_config.clone(),
                executor,
                RecipientSource::RequestBody,
                metrics.clone(),
            )
        }
    };

    let state = Arc::new(ApiState {
        config: shared_config,
        distributor: Arc::new(distributor),
        metrics,
    });

    tokio::select! {
        result = api::run_api_server(state) => {
            if let Err(e) = &result {
                error!("HTTP API exited: {}", e);
            }
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("🛑 Shutdown signal received");
        }
    }

    info!("👋 Token Reward Bot shutting down");
    Ok(())
}

/// Send logs to an append-only file, or stderr if it cannot be opened.
/// `RUST_LOG` takes precedence over `--log-level`.
fn init_logging(log_level: &str, log_file: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    match OpenOptions::new().create(true).append(true).open(log_file) {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        Err(e) => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            warn!("Cannot open log file {}: {}, logging to stderr", log_file, e);
        }
    }
}
