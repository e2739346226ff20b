//! Failure taxonomy for header parsing and exchange handling.
//!
//! `HeaderError` is produced by the parser, `ExchangeError` by the exchange
//! handler. The exchange error decides which status line, if any, the client
//! gets to see.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::http::status::StatusCode;

/// Errors raised while reading and interpreting a header block.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// Start line, a single field, or the field count is over its limit.
    #[error("{what} exceeds the limit of {limit}")]
    ByteLimitExceeded { what: &'static str, limit: usize },

    /// A `transfer-encoding` other than `identity` or `chunked`.
    #[error("unsupported transfer encoding: {0}")]
    UnsupportedTransferEncoding(String),

    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// The stream ended after the header had started but before its blank line.
    #[error("stream ended before the header was complete")]
    Incomplete,

    /// The stream ended before the first header byte.
    #[error("connection closed before a header was received")]
    ConnectionClosed,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl HeaderError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        HeaderError::MalformedHeader(message.into())
    }
}

/// Errors surfaced by one request or response pass.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error(transparent)]
    Header(#[from] HeaderError),

    /// The header was not complete within the receive timeout.
    #[error("header not received within {0:?}")]
    Timeout(Duration),

    /// Shutdown was signalled while the exchange was in progress.
    #[error("exchange interrupted")]
    Interrupted,

    /// Copying the header or body to the other side failed.
    #[error("relay failed: {0}")]
    Relay(#[source] io::Error),
}

impl ExchangeError {
    /// Status sent to the client when the request pass fails.
    ///
    /// `None` means the client is already gone and nothing is sent.
    pub fn request_status(&self) -> Option<StatusCode> {
        let status = match self {
            ExchangeError::Header(HeaderError::ConnectionClosed) => return None,
            ExchangeError::Header(HeaderError::UnsupportedTransferEncoding(_)) => StatusCode::LengthRequired,
            ExchangeError::Header(HeaderError::ByteLimitExceeded { .. }) => StatusCode::RequestHeaderFieldsTooLarge,
            ExchangeError::Interrupted => StatusCode::ServiceUnavailable,
            ExchangeError::Timeout(_) => StatusCode::RequestTimeout,
            _ => StatusCode::BadRequest,
        };
        Some(status)
    }

    /// Status sent to the client when the response pass fails before any
    /// response byte was forwarded.
    ///
    /// Unsupported transfer encodings from the target fall through to 502.
    pub fn response_status(&self) -> StatusCode {
        match self {
            ExchangeError::Interrupted => StatusCode::ServiceUnavailable,
            ExchangeError::Timeout(_) => StatusCode::GatewayTimeout,
            _ => StatusCode::BadGateway,
        }
    }

    /// True for failures that are a normal end of a session: a peer hanging
    /// up, a socket closed underneath us, or shutdown.
    pub fn is_disconnect(&self) -> bool {
        match self {
            ExchangeError::Interrupted | ExchangeError::Header(HeaderError::ConnectionClosed) => true,
            ExchangeError::Header(HeaderError::Io(err)) | ExchangeError::Relay(err) => is_socket_closed(err),
            _ => false,
        }
    }
}

/// Errors that mean the socket was closed, by the peer or locally.
pub fn is_socket_closed(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
    )
}
