//! Wire-level constants shared by the parser and writer.

pub const HTTP_VERSION: &str = "HTTP/1.1";
pub const HTTP_VERSION_PREFIX: &str = "HTTP/";

pub const CRLF: &[u8] = b"\r\n";
pub const FIELD_SEPARATOR: &[u8] = b": ";

pub const HOST: &str = "host";
pub const CONNECTION: &str = "connection";
pub const UPGRADE: &str = "upgrade";
pub const CONTENT_LENGTH: &str = "content-length";
pub const TRANSFER_ENCODING: &str = "transfer-encoding";

pub const TRANSFER_ENCODING_IDENTITY: &str = "identity";
pub const TRANSFER_ENCODING_CHUNKED: &str = "chunked";

/// Value forced onto every forwarded `connection` field.
pub const CONNECTION_CLOSE: &[u8] = b"close";

/// Highest status code accepted in a status line.
pub const MAX_STATUS_CODE: u16 = 999;

/// Upper bound for a chunk-size line or trailer line while relaying chunked bodies.
pub const CHUNK_LINE_SIZE_LIMIT: usize = 8 * 1024;
