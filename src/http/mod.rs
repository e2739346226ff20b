//! HTTP/1.1 message handling.
//!
//! # Data Flow
//! ```text
//! client bytes
//!     → parser.rs (header block, rewrite rules, body framing)
//!     → writer.rs (rewritten header, body relayed as framed)
//!     → target
//! target bytes
//!     → parser.rs
//!     → writer.rs
//!     → client
//! ```
//!
//! exchange.rs drives both passes and maps failures to the status the
//! client receives.

pub mod constants;
pub mod error;
pub mod exchange;
mod line;
pub mod parser;
pub mod status;
pub mod writer;

pub use error::{ExchangeError, HeaderError};
pub use exchange::ExchangeHandler;
pub use parser::{FieldLimits, Framing, HeaderField, HeaderParseResult, HeaderParser, MessageKind};
pub use status::StatusCode;
pub use writer::MessageWriter;
