//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the routing table from validated configuration
//! - Start the metrics exporter when enabled
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Routes are registered before the listener is bound, so no request
//!   ever sees a partially built table
//! - Listener starts last (traffic only when ready)

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::config::ProxyConfig;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::routing::RouteError;

/// Error that prevents the proxy from serving.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("route setup failed: {0}")]
    Routes(#[from] RouteError),

    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),

    #[error("metrics exporter failed: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("listener failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the proxy and serve until SIGINT/SIGTERM.
pub async fn run(config: ProxyConfig) -> Result<(), StartupError> {
    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());
    serve(config, shutdown).await
}

/// Start the proxy and serve until `shutdown` is triggered.
pub async fn serve(config: ProxyConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    let server = HttpServer::new(&config)?;

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let bind_address = config.server.bind_address();
    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Starting proxy");

    server.run(listener, shutdown.subscribe()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathConfig;

    fn path(location: &str) -> PathConfig {
        PathConfig {
            location: location.to_string(),
            target: "http://127.0.0.1:9000".to_string(),
            connection_limit: 1,
            drop_over_limit: false,
        }
    }

    #[tokio::test]
    async fn duplicate_location_fails_before_binding() {
        let mut config = ProxyConfig::default();
        config.server.listen = "127.0.0.1:0".to_string();
        config.server.paths = vec![path("/api/"), path("/api/")];

        let err = serve(config, Shutdown::new()).await.unwrap_err();
        assert!(matches!(err, StartupError::Routes(RouteError::DuplicatePattern(_))));
    }

    #[tokio::test]
    async fn bad_metrics_address_is_reported() {
        let mut config = ProxyConfig::default();
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "not an address".to_string();

        let err = serve(config, Shutdown::new()).await.unwrap_err();
        assert!(matches!(err, StartupError::MetricsAddress(_)));
    }
}
