//! Reverse proxy with per-route admission control.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request     ┌────────┐   ┌────────────┐   ┌─────────────┐   ┌──────────┐
//!     ──────────────────▶│  http  │──▶│  routing   │──▶│  admission  │──▶│  proxy   │──▶ Upstream
//!                        │ server │   │   table    │   │    gate     │   │ forward  │
//!     ◀──────────────────│        │◀──┴────────────┴───┴─────────────┴───│          │◀── Response
//!     404 / 503 / 502    └────────┘   no route → 404   full + drop → 503  fault → 502
//! ```
//!
//! Each route owns one admission gate sized to its `connection_limit`. When a
//! route is full, `drop_over_limit: true` answers 503 immediately; otherwise
//! the request waits for a slot.

use std::path::PathBuf;

use clap::Parser;

use limiting_proxy::config::load_config;
use limiting_proxy::lifecycle::startup;
use limiting_proxy::observability::logging;

#[derive(Parser)]
#[command(name = "limiting-proxy")]
#[command(about = "Reverse proxy with per-route concurrency limits", long_about = None)]
struct Args {
    /// Path to the configuration file (YAML, or TOML by extension).
    #[arg(short, long, env = "CONFIG_FILE", default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(&args.config)?;
    logging::init_logging(&config.observability.log_level);

    tracing::info!(
        config = %args.config.display(),
        routes = config.server.paths.len(),
        "limiting-proxy v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
