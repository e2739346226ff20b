//! Transparent HTTP/1.1 reverse proxy.
//!
//! Every client connection is paired with its own connection to a single
//! configured target. Requests and responses are relayed byte for byte apart
//! from a few header rewrites, and failures the proxy detects itself are
//! answered with a bare status line.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use lifecycle::Shutdown;
pub use net::ProxyServer;
