//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, connection limit)
//!     → server.rs (spawn one task per client)
//!     → target.rs (connect to the target, bounded by the connect timeout)
//!     → handler.rs (sequential exchanges until the session ends)
//!     → both sockets closed together
//! ```
//!
//! # Design Decisions
//! - Bounded accept: a full pool delays accepting rather than refusing
//! - Each handler is tracked so shutdown can drain and monitoring can count

pub mod connection;
pub mod handler;
pub mod listener;
pub mod server;
pub mod target;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionPair, ConnectionTracker};
pub use handler::ConnectionHandler;
pub use listener::{ConnectionPermit, Listener, ListenerError};
pub use server::ProxyServer;
pub use target::{TargetConnector, TargetError};
