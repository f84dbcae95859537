//! fwdnet RPC Server - JSON-RPC tool surface for the Forward Networks API.
//!
//! This binary exposes the NQE catalog sync engine and the network/location
//! operations of `fwdnet-core` as named JSON-RPC 2.0 methods.

mod handlers;
mod server;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use fwdnet_core::{CancellationToken, ForwardClient, ForwardConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Compact,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "fwdnet-rpc")]
#[command(about = "JSON-RPC tool server for the Forward Networks API")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Config file (defaults to the per-user config location if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value = "compact")]
    log_format: LogFormat,
}

fn init_logging(args: &Args) {
    let default_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout is reserved for the RPC_PORT handshake
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match args.log_format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    info!("Starting fwdnet RPC server");

    let config = ForwardConfig::load(args.config.as_deref())?;
    info!("Forward instance: {}", config.api_url);

    let client = ForwardClient::new(&config)?;
    let shutdown = CancellationToken::new();

    let addr = server::start_server(
        client,
        config.sync_concurrency,
        shutdown.clone(),
        &args.host,
        args.port,
    )
    .await?;

    // Read by the launching process
    println!("RPC_PORT={}", addr.port());

    info!("RPC server running on {}", addr);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, cancelling running syncs");
    shutdown.cancel();

    Ok(())
}
