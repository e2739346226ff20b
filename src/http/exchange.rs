//! One request pass and one response pass of a proxied exchange.
//!
//! # Responsibilities
//! - Receive the header under the direction's receive timeout
//! - Relay header and body to the other side
//! - Translate failures into a synthesized status for the client
//!
//! # Design Decisions
//! - The receive timeout is a hard deadline measured from the start of the
//!   pass, not from the first byte
//! - Header reception and relaying are both abandoned when shutdown is
//!   signalled; dropping the futures cancels any pending socket read
//! - On the response side no status is synthesized once forwarding to the
//!   client has begun, since it would corrupt the relayed response

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};
use tokio::time;

use crate::config::HttpConfig;
use crate::http::error::{is_socket_closed, ExchangeError};
use crate::http::parser::{HeaderParseResult, HeaderParser, MessageKind};
use crate::http::status::StatusCode;
use crate::http::writer::MessageWriter;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;

/// Runs request and response passes for a connection.
#[derive(Debug, Clone)]
pub struct ExchangeHandler {
    parser: HeaderParser,
    writer: MessageWriter,
}

impl ExchangeHandler {
    pub fn new(parser: HeaderParser, writer: MessageWriter) -> Self {
        Self { parser, writer }
    }

    pub fn from_config(config: &HttpConfig) -> Self {
        Self::new(
            HeaderParser::new(config.request.limits(), config.response.limits()),
            MessageWriter::new(),
        )
    }

    /// Relay one request from `source` (client) to `target`.
    ///
    /// `on_start` runs when the first request byte arrives. On failure the
    /// matching status is sent to the client before the error is returned.
    pub async fn handle_request<S, T, F>(
        &self,
        source: &mut S,
        target: &mut T,
        shutdown: &ShutdownSignal,
        on_start: F,
    ) -> Result<(), ExchangeError>
    where
        S: AsyncBufRead + AsyncWrite + Unpin,
        T: AsyncWrite + Unpin,
        F: FnOnce(),
    {
        let result = async {
            let header = self
                .receive_header(source, MessageKind::Request, shutdown, on_start)
                .await?;
            tracing::debug!(request_line = %header.start_line(), framing = ?header.framing(), "Request header received");
            self.relay(&header, source, target, shutdown).await
        }
        .await;

        if let Err(err) = result {
            if let Some(status) = err.request_status() {
                send_status(source, status, MessageKind::Request).await;
            }
            return Err(err);
        }
        Ok(())
    }

    /// Relay one response from `target` back to `source` (client).
    ///
    /// `on_end` runs after the complete response has been forwarded.
    pub async fn handle_response<S, T, F>(
        &self,
        source: &mut S,
        target: &mut T,
        shutdown: &ShutdownSignal,
        on_end: F,
    ) -> Result<(), ExchangeError>
    where
        S: AsyncWrite + Unpin,
        T: AsyncBufRead + Unpin,
        F: FnOnce(),
    {
        let sending_started = AtomicBool::new(false);

        let result = async {
            let header = self
                .receive_header(target, MessageKind::Response, shutdown, || {
                    tracing::trace!("Response header reception started")
                })
                .await?;
            tracing::debug!(status_line = %header.start_line(), framing = ?header.framing(), "Response header received");
            sending_started.store(true, Ordering::Release);
            self.relay(&header, target, source, shutdown).await
        }
        .await;

        match result {
            Ok(()) => {
                on_end();
                Ok(())
            }
            Err(err) => {
                if sending_started.load(Ordering::Acquire) {
                    tracing::debug!(error = %err, "Response relay failed after forwarding began, no status sent");
                } else {
                    send_status(source, err.response_status(), MessageKind::Response).await;
                }
                Err(err)
            }
        }
    }

    async fn receive_header<R, F>(
        &self,
        reader: &mut R,
        kind: MessageKind,
        shutdown: &ShutdownSignal,
        on_start: F,
    ) -> Result<HeaderParseResult, ExchangeError>
    where
        R: AsyncBufRead + Unpin,
        F: FnOnce(),
    {
        let timeout = self.parser.limits(kind).receive_timeout;

        tokio::select! {
            biased;
            _ = shutdown.triggered() => Err(ExchangeError::Interrupted),
            parsed = time::timeout(timeout, self.parser.parse(reader, kind, on_start)) => match parsed {
                Ok(result) => Ok(result?),
                Err(_) => Err(ExchangeError::Timeout(timeout)),
            },
        }
    }

    async fn relay<R, W>(
        &self,
        header: &HeaderParseResult,
        reader: &mut R,
        writer: &mut W,
        shutdown: &ShutdownSignal,
    ) -> Result<(), ExchangeError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tokio::select! {
            biased;
            _ = shutdown.triggered() => Err(ExchangeError::Interrupted),
            relayed = self.writer.write_message(header, reader, writer) => match relayed {
                Ok(body_bytes) => {
                    tracing::trace!(body_bytes, "Message relayed");
                    Ok(())
                }
                Err(err) => Err(ExchangeError::Relay(err)),
            },
        }
    }
}

/// Best effort: a client that is already gone is not an error worth raising.
async fn send_status<W>(client: &mut W, status: StatusCode, kind: MessageKind)
where
    W: AsyncWrite + Unpin,
{
    metrics::record_synthesized_status(status, kind);

    let sent = async {
        client.write_all(&status.to_response()).await?;
        client.flush().await
    }
    .await;

    match sent {
        Ok(()) => tracing::debug!(status = %status, "Sent status to client"),
        Err(err) if is_socket_closed(&err) => {
            tracing::debug!(status = %status, error = %err, "Client closed before status could be sent")
        }
        Err(err) => tracing::warn!(status = %status, error = %err, "Could not send HTTP status to the client"),
    }
}
