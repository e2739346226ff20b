//! Bounded line reading on top of a buffered stream.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

#[derive(Debug)]
pub(crate) enum LineError {
    /// The line content exceeded the limit before a terminator was found.
    TooLong,
    /// The stream ended before the line terminator.
    Eof,
    Io(io::Error),
}

impl From<LineError> for io::Error {
    fn from(err: LineError) -> Self {
        match err {
            LineError::TooLong => io::Error::new(io::ErrorKind::InvalidData, "line exceeds limit"),
            LineError::Eof => io::Error::new(io::ErrorKind::UnexpectedEof, "stream ended inside a line"),
            LineError::Io(err) => err,
        }
    }
}

/// Appends one line, terminator included, to `buf`.
///
/// Lines end at `\n`; a preceding `\r` belongs to the terminator. `limit`
/// bounds the content without the terminator. Returns the bytes consumed.
pub(crate) async fn read_line<R>(reader: &mut R, buf: &mut Vec<u8>, limit: usize) -> Result<usize, LineError>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    let start = buf.len();
    loop {
        let available = reader.fill_buf().await.map_err(LineError::Io)?;
        if available.is_empty() {
            return Err(LineError::Eof);
        }

        let (done, used) = match available.iter().position(|&b| b == b'\n') {
            Some(i) => (true, i + 1),
            None => (false, available.len()),
        };
        buf.extend_from_slice(&available[..used]);
        reader.consume(used);

        let line = &buf[start..];
        if done {
            if trim_line_ending(line).len() > limit {
                return Err(LineError::TooLong);
            }
            return Ok(line.len());
        }
        // One extra byte may be a pending '\r'.
        if line.len() > limit.saturating_add(1) {
            return Err(LineError::TooLong);
        }
    }
}

/// Strips a trailing `\r\n` or `\n`.
pub(crate) fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
