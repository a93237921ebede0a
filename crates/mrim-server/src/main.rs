//! MRIM server binary.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: 0.0.0.0:2041, ping interval 10s
//! mrim-server
//!
//! # Users and settings from a config file, port overridden on the command line
//! mrim-server --config mrim.json --port 2042
//! ```

use std::path::PathBuf;

use clap::Parser;
use mrim_server::{FileConfig, Overrides, Server, ServerConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// MRIM protocol server
#[derive(Parser, Debug)]
#[command(name = "mrim-server")]
#[command(about = "Legacy MRIM instant messaging server")]
#[command(version)]
struct Args {
    /// JSON config file
    #[arg(short, long, env = "MRIM_CONFIG")]
    config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Seconds between client pings
    #[arg(long, env = "PING_INTERVAL_SECS")]
    ping_interval: Option<u32>,

    /// Maximum concurrent connections
    #[arg(long)]
    max_connections: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let file = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let overrides = Overrides {
        host: args.host,
        port: args.port,
        ping_interval_secs: args.ping_interval,
        log_level: args.log_level,
        max_connections: args.max_connections,
    };
    let config = ServerConfig::resolve(file, overrides)?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("MRIM server starting");
    tracing::info!("Binding to {}", config.bind_address());

    let server = Server::from_config(&config).await?;

    tracing::info!(
        ping_interval_secs = config.ping_interval_secs,
        max_connections = config.max_connections,
        "Server listening on {}",
        server.local_addr()?
    );

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("cannot listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}
