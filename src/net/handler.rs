//! Per-connection exchange loop.
//!
//! A handler owns the client socket and its target socket for the whole
//! session and runs strictly sequential exchanges on them: one request pass,
//! then one response pass, until either side fails or hangs up.

use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::Instrument;

use crate::http::error::is_socket_closed;
use crate::http::{ExchangeError, ExchangeHandler, MessageKind};
use crate::lifecycle::ShutdownSignal;
use crate::net::connection::{ConnectionGuard, ConnectionId, ConnectionPair};
use crate::observability::metrics;

pub struct ConnectionHandler<S, T> {
    source: BufReader<S>,
    target: BufReader<T>,
    exchange: Arc<ExchangeHandler>,
    shutdown: ShutdownSignal,
    guard: ConnectionGuard,
}

impl<S, T> ConnectionHandler<S, T>
where
    S: AsyncRead + AsyncWrite + Unpin,
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        pair: ConnectionPair<S, T>,
        exchange: Arc<ExchangeHandler>,
        shutdown: ShutdownSignal,
        guard: ConnectionGuard,
    ) -> Self {
        Self {
            source: BufReader::new(pair.source),
            target: BufReader::new(pair.target),
            exchange,
            shutdown,
            guard,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.guard.id()
    }

    /// Serve exchanges until the session ends, then close both sockets.
    ///
    /// Returns the number of completed exchanges.
    pub async fn run(mut self) -> u64 {
        let span = tracing::debug_span!("connection", connection_id = %self.id());
        async move {
            let exchanges = self.serve().await;
            self.close().await;
            tracing::debug!(exchanges, "Connection closed");
            exchanges
        }
        .instrument(span)
        .await
    }

    async fn serve(&mut self) -> u64 {
        let mut exchanges = 0;
        let guard = &self.guard;

        loop {
            let started = Instant::now();

            let request = self
                .exchange
                .handle_request(&mut self.source, &mut self.target, &self.shutdown, || guard.mark_busy())
                .await;
            if let Err(err) = request {
                log_failure(MessageKind::Request, &err);
                return exchanges;
            }

            let response = self
                .exchange
                .handle_response(&mut self.source, &mut self.target, &self.shutdown, || guard.mark_idle())
                .await;
            if let Err(err) = response {
                log_failure(MessageKind::Response, &err);
                return exchanges;
            }

            exchanges += 1;
            metrics::record_exchange(started.elapsed());
            tracing::trace!(exchanges, "Exchange complete");
        }
    }

    async fn close(&mut self) {
        for result in [
            self.source.get_mut().shutdown().await,
            self.target.get_mut().shutdown().await,
        ] {
            if let Err(err) = result {
                if !is_socket_closed(&err) {
                    tracing::debug!(error = %err, "Error while closing socket");
                }
            }
        }
    }
}

fn log_failure(kind: MessageKind, err: &ExchangeError) {
    if err.is_disconnect() {
        tracing::debug!(direction = kind.as_str(), error = %err, "Session ended");
    } else {
        tracing::warn!(direction = kind.as_str(), error = %err, "Exchange failed, closing connection");
    }
}
