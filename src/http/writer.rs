//! Header and body relay.
//!
//! # Responsibilities
//! - Write the rewritten header block downstream
//! - Copy the body according to the framing decided by the parser
//!
//! # Design Decisions
//! - Bodies are streamed; memory stays bounded regardless of body size
//! - Chunked bodies are copied verbatim, chunk-size lines included

use std::io;

use tokio::io::{AsyncBufRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::constants::CHUNK_LINE_SIZE_LIMIT;
use crate::http::line::{read_line, trim_line_ending};
use crate::http::parser::{Framing, HeaderParseResult};

/// Relays one HTTP message from a buffered reader to a writer.
#[derive(Debug, Clone)]
pub struct MessageWriter {
    chunk_line_limit: usize,
}

impl Default for MessageWriter {
    fn default() -> Self {
        Self {
            chunk_line_limit: CHUNK_LINE_SIZE_LIMIT,
        }
    }
}

impl MessageWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `header` and then its body, read from `reader`, to `writer`.
    ///
    /// `reader` must be positioned right after the header block. Returns the
    /// number of body bytes relayed.
    pub async fn write_message<R, W>(&self, header: &HeaderParseResult, reader: &mut R, writer: &mut W) -> io::Result<u64>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        writer.write_all(&header.encode()).await?;

        let copied = match header.framing() {
            Framing::None => 0,
            Framing::FixedLength(length) => copy_exact(reader, writer, length).await?,
            Framing::Chunked => self.copy_chunked(reader, writer).await?,
        };

        writer.flush().await?;
        Ok(copied)
    }

    async fn copy_chunked<R, W>(&self, reader: &mut R, writer: &mut W) -> io::Result<u64>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = Vec::with_capacity(32);
        let mut copied = 0u64;

        loop {
            line.clear();
            copied += read_line(reader, &mut line, self.chunk_line_limit).await? as u64;
            let size = parse_chunk_size(trim_line_ending(&line))?;
            writer.write_all(&line).await?;

            if size == 0 {
                break;
            }

            copied += copy_exact(reader, writer, size).await?;

            line.clear();
            copied += read_line(reader, &mut line, self.chunk_line_limit).await? as u64;
            if !trim_line_ending(&line).is_empty() {
                return Err(invalid_data("chunk data not followed by line terminator"));
            }
            writer.write_all(&line).await?;
        }

        // Trailer section, ended by an empty line.
        loop {
            line.clear();
            copied += read_line(reader, &mut line, self.chunk_line_limit).await? as u64;
            writer.write_all(&line).await?;
            if trim_line_ending(&line).is_empty() {
                return Ok(copied);
            }
        }
    }
}

/// Copy exactly `length` bytes, failing if the stream ends early.
async fn copy_exact<R, W>(reader: &mut R, writer: &mut W, length: u64) -> io::Result<u64>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut body = reader.take(length);
    let copied = tokio::io::copy_buf(&mut body, writer).await?;
    if copied < length {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("body ended after {copied} of {length} bytes"),
        ));
    }
    Ok(copied)
}

fn parse_chunk_size(line: &[u8]) -> io::Result<u64> {
    let size = match line.iter().position(|&b| b == b';') {
        Some(i) => &line[..i],
        None => line,
    };
    let size = std::str::from_utf8(size)
        .map_err(|_| invalid_data("chunk size is not valid text"))?
        .trim_matches(|c| c == ' ' || c == '\t');

    if size.is_empty() || !size.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid_data("invalid chunk size"));
    }
    u64::from_str_radix(size, 16).map_err(|_| invalid_data("chunk size out of range"))
}

fn invalid_data(message: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}
