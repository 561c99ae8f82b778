//! vistad — currency read-model daemon.
//!
//! Consumes finalized blocks and serves the digest store through the HAL
//! HTTP API:
//!
//! ```text
//! ┌──────────────┐  blocks   ┌─────────────────────────────────┐
//! │  Consensus   │──────────►│             vistad              │
//! │  (external)  │           │                                 │
//! └──────────────┘           │  ┌──────────┐   ┌────────────┐  │
//!                            │  │ Digester │──►│   Digest   │  │
//!        ┌──────────┐  HTTP  │  └──────────┘   │   Store    │  │
//!        │  Wallet  │◄──────►│  ┌──────────┐   └────────────┘  │
//!        └──────────┘        │  │ HAL API  │◄───── Cache       │
//!                            │  └──────────┘                   │
//!                            └─────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Serve the API over an existing store
//! vistad run
//!
//! # Replay a file of finalized blocks through the digester, then serve
//! vistad run --blocks-file blocks.json
//!
//! # Roll the read-model back below height 42
//! vistad clean --height 42
//! ```

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use prometheus_client::registry::Registry;
use tracing_subscriber::EnvFilter;
use vista_api::{run_server, ApiConfig, ApiMetrics, ApiState};
use vista_builder::Builder;
use vista_core::{Block, FactRegistry, Height, NetworkId};
use vista_digest::{Database, DigestMetrics, DigestStore, Digester};

use crate::config::Config;

type MainResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "vistad", version, about = "Currency read-model daemon")]
struct Cli {
    /// Path to a JSON config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HAL API, optionally replaying a block file first.
    Run {
        /// JSON file holding an array of finalized blocks to digest.
        #[arg(long)]
        blocks_file: Option<PathBuf>,
        /// Serve queries only; reject every mutation.
        #[arg(long)]
        read_only: bool,
    },
    /// Remove indexed documents: everything, or heights >= --height.
    Clean {
        #[arg(long)]
        height: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> MainResult {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Run {
            blocks_file,
            read_only,
        } => run(config, blocks_file, read_only).await,
        Command::Clean { height } => clean(config, height),
    }
}

async fn run(config: Config, blocks_file: Option<PathBuf>, read_only: bool) -> MainResult {
    let mut registry = Registry::default();
    let digest_metrics = Arc::new(DigestMetrics::new());
    digest_metrics.register(&mut registry);
    let api_metrics = Arc::new(ApiMetrics::new());
    api_metrics.register(&mut registry);

    let store = DigestStore::open(&config.store_path)?;
    let database = Arc::new(
        Database::new(store, read_only).with_metrics(digest_metrics.clone()),
    );
    database.initialize()?;

    let cache = vista_cache::from_uri(&config.cache_uri)?;
    let network_id = NetworkId::new(config.network_id.clone())?;
    let builder = Builder::new(Arc::new(FactRegistry::with_defaults()), network_id);

    let state = ApiState::new(
        database.clone(),
        Arc::new(builder),
        cache,
        Arc::new(registry),
        api_metrics,
        None,
        config.network_id.clone(),
        env!("CARGO_PKG_VERSION").into(),
    );

    let digester = if read_only {
        None
    } else {
        Some(Digester::start(database.clone(), None))
    };

    if let Some(path) = blocks_file {
        match &digester {
            Some(digester) => {
                let blocks = load_blocks(&path)?;
                tracing::info!(count = blocks.len(), "replaying finalized blocks");
                digester.digest(blocks).await?;
            }
            None => return Err("cannot replay blocks in read-only mode".into()),
        }
    }

    let api_config = ApiConfig {
        host: config.host.clone(),
        port: config.port,
        enable_cors: config.enable_cors,
        ..ApiConfig::default()
    };
    tokio::select! {
        result = run_server(&api_config, state) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }

    if let Some(digester) = digester {
        digester.stop().await;
    }
    Ok(())
}

fn clean(config: Config, height: Option<i64>) -> MainResult {
    let store = DigestStore::open(&config.store_path)?;
    let database = Database::new(store, false);
    database.initialize()?;

    match height {
        Some(h) => {
            database.clean_by_height(Height::new(h))?;
            tracing::info!(height = h, "cleaned from height");
        }
        None => {
            database.clean()?;
            tracing::info!("cleaned all digest documents");
        }
    }
    Ok(())
}

fn load_blocks(path: &Path) -> Result<Vec<Block>, Box<dyn std::error::Error + Send + Sync>> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read blocks file '{}': {e}", path.display()))?;
    let blocks: Vec<Block> =
        serde_json::from_str(&data).map_err(|e| format!("invalid blocks JSON: {e}"))?;
    Ok(blocks)
}
