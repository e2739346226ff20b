//! HTTP/1.1 header block parsing and rewriting.
//!
//! # Responsibilities
//! - Read the start line and fields up to the blank line, enforcing limits
//! - Lowercase field names, force `connection: close`, drop `upgrade`
//! - Decide body framing before any body byte is read
//!
//! Apart from the rewrites above, field order and values are forwarded
//! exactly as received, duplicates included.

use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::http::constants::*;
use crate::http::error::HeaderError;
use crate::http::line::{read_line, trim_line_ending, LineError};

/// Direction of the message being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Request,
    Response,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Request => "request",
            MessageKind::Response => "response",
        }
    }

    fn start_line_name(self) -> &'static str {
        match self {
            MessageKind::Request => "request line",
            MessageKind::Response => "status line",
        }
    }
}

/// Size limits and receive timeout for one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLimits {
    /// Request-line or status-line size in bytes.
    pub start_line_size_limit: usize,
    /// Number of fields.
    pub fields_limit: usize,
    /// Size of a single field line in bytes.
    pub field_size_limit: usize,
    /// Wall-clock bound for the complete header.
    pub receive_timeout: Duration,
}

/// How the end of the message body is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// No body follows the header.
    None,
    /// Exactly this many body bytes follow.
    FixedLength(u64),
    /// The body is a sequence of chunks ending with a zero-size chunk.
    Chunked,
}

/// One forwarded header field. The name is already lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    pub name: String,
    pub value: Vec<u8>,
}

impl HeaderField {
    /// The value as text, if it is valid UTF-8.
    pub fn value_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }
}

/// Outcome of parsing one header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderParseResult {
    start_line: String,
    fields: Vec<HeaderField>,
    header_length: u64,
    framing: Framing,
}

impl HeaderParseResult {
    pub fn start_line(&self) -> &str {
        &self.start_line
    }

    /// Fields in forwarding order, after rewriting.
    pub fn fields(&self) -> &[HeaderField] {
        &self.fields
    }

    /// Values of every field with the given lowercase name, in order.
    pub fn values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a [u8]> + 'a {
        self.fields
            .iter()
            .filter(move |field| field.name == name)
            .map(|field| field.value.as_slice())
    }

    /// Bytes consumed from the stream, blank line included.
    pub fn header_length(&self) -> u64 {
        self.header_length
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    pub fn content_length(&self) -> Option<u64> {
        match self.framing {
            Framing::FixedLength(length) => Some(length),
            _ => None,
        }
    }

    /// Header plus body length as received, unless the body is chunked.
    pub fn total_length(&self) -> Option<u64> {
        match self.framing {
            Framing::None => Some(self.header_length),
            Framing::FixedLength(length) => self.header_length.checked_add(length),
            Framing::Chunked => None,
        }
    }

    /// The rewritten header block as it is sent downstream.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.header_length as usize + 16);
        out.extend_from_slice(self.start_line.as_bytes());
        out.extend_from_slice(CRLF);
        for field in &self.fields {
            out.extend_from_slice(field.name.as_bytes());
            out.extend_from_slice(FIELD_SEPARATOR);
            out.extend_from_slice(&field.value);
            out.extend_from_slice(CRLF);
        }
        out.extend_from_slice(CRLF);
        out
    }
}

/// Parses header blocks with per-direction limits.
#[derive(Debug, Clone)]
pub struct HeaderParser {
    request: FieldLimits,
    response: FieldLimits,
}

impl HeaderParser {
    pub fn new(request: FieldLimits, response: FieldLimits) -> Self {
        Self { request, response }
    }

    pub fn limits(&self, kind: MessageKind) -> &FieldLimits {
        match kind {
            MessageKind::Request => &self.request,
            MessageKind::Response => &self.response,
        }
    }

    /// Read one header block from `reader`.
    ///
    /// `on_start` runs once, as soon as the first header byte is available.
    /// On success the reader is positioned at the first body byte.
    pub async fn parse<R, F>(&self, reader: &mut R, kind: MessageKind, on_start: F) -> Result<HeaderParseResult, HeaderError>
    where
        R: AsyncBufRead + Unpin,
        F: FnOnce(),
    {
        let limits = self.limits(kind);

        if reader.fill_buf().await?.is_empty() {
            return Err(HeaderError::ConnectionClosed);
        }
        on_start();

        let mut line = Vec::with_capacity(256);
        let mut header_length = read_header_line(reader, &mut line, limits.start_line_size_limit, kind.start_line_name()).await?;
        let start_line = parse_start_line(trim_line_ending(&line), kind)?;

        let mut fields = FieldsBuilder::default();
        let mut count = 0usize;
        loop {
            line.clear();
            header_length += read_header_line(reader, &mut line, limits.field_size_limit, "header field").await?;

            let content = trim_line_ending(&line);
            if content.is_empty() {
                break;
            }

            count += 1;
            if count > limits.fields_limit {
                return Err(HeaderError::ByteLimitExceeded {
                    what: "number of header fields",
                    limit: limits.fields_limit,
                });
            }
            fields.push(parse_field(content)?)?;
        }

        let framing = fields.framing()?;
        Ok(HeaderParseResult {
            start_line,
            fields: fields.fields,
            header_length: header_length as u64,
            framing,
        })
    }
}

async fn read_header_line<R>(reader: &mut R, line: &mut Vec<u8>, limit: usize, what: &'static str) -> Result<usize, HeaderError>
where
    R: AsyncBufRead + Unpin,
{
    read_line(reader, line, limit).await.map_err(|err| match err {
        LineError::TooLong => HeaderError::ByteLimitExceeded { what, limit },
        LineError::Eof => HeaderError::Incomplete,
        LineError::Io(err) => HeaderError::Io(err),
    })
}

fn parse_start_line(line: &[u8], kind: MessageKind) -> Result<String, HeaderError> {
    let text = std::str::from_utf8(line)
        .map_err(|_| HeaderError::malformed(format!("{} is not valid text", kind.start_line_name())))?;

    let valid = match kind {
        MessageKind::Request => is_request_line(text),
        MessageKind::Response => is_status_line(text),
    };
    if !valid {
        return Err(HeaderError::malformed(format!("invalid {}: {:?}", kind.start_line_name(), text)));
    }
    Ok(text.to_string())
}

fn is_request_line(text: &str) -> bool {
    let mut parts = text.split(' ');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(target), Some(version), None) => {
            !method.is_empty() && method.bytes().all(is_token_byte) && !target.is_empty() && version.starts_with(HTTP_VERSION_PREFIX)
        }
        _ => false,
    }
}

fn is_status_line(text: &str) -> bool {
    let mut parts = text.splitn(3, ' ');
    let (Some(version), Some(code)) = (parts.next(), parts.next()) else {
        return false;
    };
    version.starts_with(HTTP_VERSION_PREFIX)
        && code.len() == 3
        && code.bytes().all(|b| b.is_ascii_digit())
        && code.parse::<u16>().is_ok_and(|code| code <= MAX_STATUS_CODE)
}

fn parse_field(line: &[u8]) -> Result<HeaderField, HeaderError> {
    if line[0] == b' ' || line[0] == b'\t' {
        return Err(HeaderError::malformed("obsolete line folding is not supported"));
    }

    let colon = line
        .iter()
        .position(|&b| b == b':')
        .ok_or_else(|| HeaderError::malformed("header field without colon"))?;
    let (name, rest) = line.split_at(colon);

    if name.is_empty() || !name.iter().copied().all(is_token_byte) {
        return Err(HeaderError::malformed(format!(
            "invalid header field name: {:?}",
            String::from_utf8_lossy(name)
        )));
    }

    Ok(HeaderField {
        name: String::from_utf8_lossy(name).to_ascii_lowercase(),
        value: trim_whitespace(&rest[1..]).to_vec(),
    })
}

/// RFC 9110 token characters.
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

fn trim_whitespace(mut value: &[u8]) -> &[u8] {
    while let [b' ' | b'\t', rest @ ..] = value {
        value = rest;
    }
    while let [rest @ .., b' ' | b'\t'] = value {
        value = rest;
    }
    value
}

/// Applies the rewrite rules and collects framing information.
#[derive(Debug, Default)]
struct FieldsBuilder {
    fields: Vec<HeaderField>,
    connection_seen: bool,
    transfer_codings: Vec<String>,
    transfer_encoding: Vec<String>,
    content_length: Option<u64>,
}

impl FieldsBuilder {
    fn push(&mut self, mut field: HeaderField) -> Result<(), HeaderError> {
        match field.name.as_str() {
            UPGRADE => return Ok(()),
            CONNECTION => {
                if self.connection_seen {
                    return Ok(());
                }
                self.connection_seen = true;
                field.value = CONNECTION_CLOSE.to_vec();
            }
            TRANSFER_ENCODING => self.add_transfer_encoding(&field)?,
            CONTENT_LENGTH => self.add_content_length(&field)?,
            _ => {}
        }
        self.fields.push(field);
        Ok(())
    }

    fn add_transfer_encoding(&mut self, field: &HeaderField) -> Result<(), HeaderError> {
        let value = field
            .value_str()
            .ok_or_else(|| HeaderError::malformed("transfer-encoding is not valid text"))?;
        self.transfer_encoding.push(value.to_string());
        if value.trim().is_empty() {
            // An empty coding list names no supported coding.
            self.transfer_codings.push(String::new());
        }
        self.transfer_codings.extend(
            value
                .split(',')
                .map(|coding| coding.trim().to_ascii_lowercase())
                .filter(|coding| !coding.is_empty()),
        );
        Ok(())
    }

    fn add_content_length(&mut self, field: &HeaderField) -> Result<(), HeaderError> {
        let value = field
            .value_str()
            .ok_or_else(|| HeaderError::malformed("content-length is not valid text"))?;
        for part in value.split(',') {
            let part = part.trim();
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(HeaderError::malformed(format!("invalid content-length: {value:?}")));
            }
            let length: u64 = part
                .parse()
                .map_err(|_| HeaderError::malformed(format!("content-length out of range: {value:?}")))?;
            match self.content_length {
                Some(existing) if existing != length => {
                    return Err(HeaderError::malformed("conflicting content-length values"));
                }
                _ => self.content_length = Some(length),
            }
        }
        Ok(())
    }

    fn framing(&self) -> Result<Framing, HeaderError> {
        let codings: Vec<&str> = self
            .transfer_codings
            .iter()
            .map(String::as_str)
            .filter(|coding| *coding != TRANSFER_ENCODING_IDENTITY)
            .collect();

        match codings.as_slice() {
            [] => Ok(match self.content_length {
                Some(length) => Framing::FixedLength(length),
                None => Framing::None,
            }),
            [TRANSFER_ENCODING_CHUNKED] => Ok(Framing::Chunked),
            _ => Err(HeaderError::UnsupportedTransferEncoding(self.transfer_encoding.join(", "))),
        }
    }
}
