//! Accept loop and connection draining.
//!
//! # Responsibilities
//! - Accept client connections through the bounded listener
//! - Open a target connection for each client and hand both to a handler
//! - On shutdown stop accepting, wait for handlers, abort stragglers

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::task::{JoinError, JoinSet};
use tokio::time;
use tracing::Instrument;

use crate::config::ProxyConfig;
use crate::http::ExchangeHandler;
use crate::lifecycle::ShutdownSignal;
use crate::net::connection::{ConnectionPair, ConnectionTracker};
use crate::net::handler::ConnectionHandler;
use crate::net::listener::{ConnectionPermit, Listener, ListenerError};
use crate::net::target::TargetConnector;
use crate::observability::metrics;

const ACCEPT_ERROR_PAUSE: Duration = Duration::from_millis(50);

pub struct ProxyServer {
    context: ConnectionContext,
    termination_timeout: Duration,
}

/// Everything a spawned connection task needs.
#[derive(Clone)]
struct ConnectionContext {
    exchange: Arc<ExchangeHandler>,
    connector: TargetConnector,
    tracker: ConnectionTracker,
    shutdown: ShutdownSignal,
}

impl ProxyServer {
    pub fn new(config: &ProxyConfig, tracker: ConnectionTracker, shutdown: ShutdownSignal) -> Self {
        Self {
            context: ConnectionContext {
                exchange: Arc::new(ExchangeHandler::from_config(&config.http)),
                connector: TargetConnector::from_config(&config.target),
                tracker,
                shutdown,
            },
            termination_timeout: config.connection_handlers.termination_timeout(),
        }
    }

    /// Serve until shutdown is signalled and all handlers have finished or
    /// been aborted.
    pub async fn run(self, listener: Listener) {
        if let Ok(address) = listener.local_addr() {
            tracing::info!(%address, target = %self.context.connector.address(), "Proxy server starting");
        }

        let mut connections = JoinSet::new();
        let shutdown = self.context.shutdown.clone();

        loop {
            tokio::select! {
                biased;
                _ = shutdown.triggered() => {
                    tracing::info!("Shutdown signalled, no longer accepting connections");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer_addr, permit)) => {
                        connections.spawn(self.context.clone().serve(stream, peer_addr, permit));
                    }
                    Err(ListenerError::Closed) => break,
                    Err(err) => {
                        tracing::error!(error = %err, "Failed to accept connection");
                        time::sleep(ACCEPT_ERROR_PAUSE).await;
                    }
                },
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    log_join_result(finished);
                }
            }
        }

        drop(listener);
        self.drain(connections).await;
        tracing::info!("Proxy server stopped");
    }

    async fn drain(&self, mut connections: JoinSet<()>) {
        if connections.is_empty() {
            return;
        }

        tracing::info!(
            remaining = connections.len(),
            timeout = ?self.termination_timeout,
            "Waiting for connection handlers to finish"
        );

        let drained = time::timeout(self.termination_timeout, async {
            while let Some(finished) = connections.join_next().await {
                log_join_result(finished);
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                remaining = connections.len(),
                "Termination timeout elapsed, aborting remaining connection handlers"
            );
            connections.shutdown().await;
        }
    }
}

impl ConnectionContext {
    async fn serve(self, client: TcpStream, peer_addr: SocketAddr, permit: ConnectionPermit) {
        let span = tracing::debug_span!("client", %peer_addr);
        async move {
            let connected = tokio::select! {
                biased;
                _ = self.shutdown.triggered() => return,
                connected = self.connector.connect() => connected,
            };

            let target = match connected {
                Ok(target) => target,
                Err(err) => {
                    metrics::record_target_connect_failure();
                    tracing::warn!(error = %err, "Could not connect to target, closing client connection");
                    return;
                }
            };

            if let Err(err) = client.set_nodelay(true) {
                tracing::debug!(error = %err, "Could not disable Nagle on client socket");
            }

            let handler = ConnectionHandler::new(
                ConnectionPair::new(client, target),
                self.exchange,
                self.shutdown,
                self.tracker.track(),
            );
            handler.run().await;
            drop(permit);
        }
        .instrument(span)
        .await
    }
}

fn log_join_result(finished: Result<(), JoinError>) {
    if let Err(err) = finished {
        if err.is_panic() {
            tracing::error!(error = %err, "Connection handler panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    use crate::config::parse_config;
    use crate::lifecycle::Shutdown;

    async fn start(target_port: u16) -> (SocketAddr, Shutdown, ConnectionTracker, tokio::task::JoinHandle<()>) {
        let config = parse_config(&format!(
            "[target]\naddress = \"127.0.0.1\"\nport = {target_port}\nconnect_timeout_ms = 500\n\n[connection_handlers]\ntermination_timeout_ms = 200\n"
        ))
        .unwrap();

        let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = tcp.local_addr().unwrap();
        let shutdown = Shutdown::new();
        let tracker = ConnectionTracker::new();
        let server = ProxyServer::new(&config, tracker.clone(), shutdown.subscribe());
        let task = tokio::spawn(server.run(Listener::from_tcp(tcp, 8)));
        (address, shutdown, tracker, task)
    }

    #[tokio::test]
    async fn unreachable_target_closes_client() {
        let unused = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target_port = unused.local_addr().unwrap().port();
        drop(unused);

        let (address, shutdown, tracker, task) = start(target_port).await;

        let mut client = TcpStream::connect(address).await.unwrap();
        let mut received = Vec::new();
        let read = time::timeout(Duration::from_secs(2), client.read_to_end(&mut received)).await;
        assert!(matches!(read, Ok(Ok(0)) | Ok(Err(_))));
        assert_eq!(tracker.active_count(), 0);

        shutdown.trigger();
        time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn shutdown_stops_accept_loop() {
        let target = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (address, shutdown, _tracker, task) = start(target.local_addr().unwrap().port()).await;

        shutdown.trigger();
        time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
        assert!(TcpStream::connect(address).await.is_err());
    }
}
