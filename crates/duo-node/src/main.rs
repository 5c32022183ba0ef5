//! duo-node — the DUO ledger HTTP service binary.
//!
//! Startup sequence:
//!   1. Resolve the chain directory, cache TTL, and listen address from
//!      flags or environment
//!   2. Build the `ChainStore` over that directory
//!   3. Serve the HTTP adapter

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use duo_chain::ChainStore;
use duo_rpc::{build_router, RpcState};

#[derive(Parser, Debug)]
#[command(name = "duo-node", version, about = "DUO ledger HTTP service")]
struct Args {
    /// Directory holding `chain_<uuid>.json` files.
    #[arg(long, env = "DUO_CHAIN_PATH")]
    chain_path: PathBuf,

    /// Seconds a loaded chain is served from cache before re-reading disk.
    #[arg(long, env = "DUO_CACHE_TTL_SECS", default_value_t = 30)]
    cache_ttl_secs: u64,

    /// HTTP listen address.
    #[arg(long, env = "DUO_LISTEN_ADDR", default_value = "127.0.0.1:8080")]
    listen_addr: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,duo=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    info!("DUO node starting");

    let chain_path = expand_tilde(&args.chain_path);
    std::fs::create_dir_all(&chain_path)
        .with_context(|| format!("creating chain directory {}", chain_path.display()))?;

    let store = Arc::new(ChainStore::new(chain_path.clone(), args.cache_ttl_secs));
    let existing = store.get_chains().context("scanning chain directory")?;
    info!(
        dir = %chain_path.display(),
        chains = existing.len(),
        ttl_secs = args.cache_ttl_secs,
        "chain store ready"
    );

    let state = RpcState::new(store);
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(args.listen_addr)
        .await
        .with_context(|| format!("binding {}", args.listen_addr))?;
    info!(addr = %args.listen_addr, "node ready");
    axum::serve(listener, router)
        .await
        .context("serving HTTP")?;

    Ok(())
}

/// Expand a leading `~` to the user's home directory (`HOME` or `USERPROFILE`).
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
