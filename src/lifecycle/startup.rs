//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize logging and metrics from the loaded configuration
//! - Bind the listener before any background task starts
//! - Run the proxy until a termination signal has been handled
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - The accept loop starts last (traffic only when ready)

use std::net::{AddrParseError, SocketAddr};

use metrics_exporter_prometheus::BuildError;
use thiserror::Error;
use tracing_subscriber::util::TryInitError;

use crate::config::ProxyConfig;
use crate::lifecycle::{signals, Shutdown};
use crate::net::{ConnectionTracker, Listener, ListenerError, ProxyServer};
use crate::observability::{logging, metrics, Monitor};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to initialize logging: {0}")]
    Logging(#[from] TryInitError),

    #[error("invalid metrics address {address}: {source}")]
    MetricsAddress {
        address: String,
        #[source]
        source: AddrParseError,
    },

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] BuildError),

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Start every subsystem and serve until SIGINT or SIGTERM.
pub async fn run(config: ProxyConfig) -> Result<(), StartupError> {
    logging::init(&config.observability.log_level)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "transparent-proxy starting");

    if config.observability.metrics_enabled {
        let address: SocketAddr =
            config
                .observability
                .metrics_address
                .parse()
                .map_err(|source| StartupError::MetricsAddress {
                    address: config.observability.metrics_address.clone(),
                    source,
                })?;
        metrics::init_metrics(address)?;
    }

    let listener = Listener::bind(&config.proxy).await?;

    let shutdown = Shutdown::new();
    let signals = signals::spawn_signal_handler(shutdown.clone());

    serve(&config, listener, &shutdown).await;

    signals.abort();
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Run the monitor and the accept loop on an already bound listener until
/// `shutdown` is triggered and connections have drained.
pub async fn serve(config: &ProxyConfig, listener: Listener, shutdown: &Shutdown) {
    let tracker = ConnectionTracker::new();

    let monitor = Monitor::new(tracker.clone(), config.connection_handlers.log_interval());
    let monitor = tokio::spawn(monitor.run(shutdown.subscribe()));

    ProxyServer::new(config, tracker, shutdown.subscribe())
        .run(listener)
        .await;

    if let Err(err) = monitor.await {
        tracing::error!(error = %err, "Connection handler monitor failed");
    }
}
