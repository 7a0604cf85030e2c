//! TCP syslog framing
//!
//! Two framings share a stream (RFC 6587):
//!
//! - **Non-transparent**: frames end with LF (or CRLF)
//! - **Octet counting**: `LEN SP MSG`, selected when a frame starts with an
//!   ASCII digit. A syslog message itself always starts with `<`, so a
//!   leading digit is unambiguous.
//!
//! Reads are bounded: a frame larger than the limit is consumed and
//! reported as `TooLong` without ever being buffered in full.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Longest accepted octet count prefix (digits)
const MAX_COUNT_DIGITS: usize = 10;

/// Result of reading one frame
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Frame {
    /// A frame is in the buffer (byte count consumed from the stream)
    Message(usize),
    /// Frame exceeded the size limit and was discarded
    TooLong,
    /// End of stream
    Eof,
}

/// Read the next frame into `buf`
///
/// For newline framing the terminator is left in `buf`; callers trim it.
pub(crate) async fn read_frame<R>(reader: &mut R, buf: &mut Vec<u8>, max_size: usize) -> io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();

    let first = {
        let available = reader.fill_buf().await?;
        match available.first() {
            Some(&b) => b,
            None => return Ok(Frame::Eof),
        }
    };

    if first.is_ascii_digit() {
        if let Some(len) = read_octet_count(reader, buf).await? {
            return read_counted(reader, buf, len, max_size).await;
        }
        // Not a count after all; the digits stay in `buf` as message text
    }

    read_bounded_line(reader, buf, max_size).await
}

/// Consume a `LEN SP` prefix
///
/// Returns `None` when the digits are not followed by a space; the consumed
/// bytes are then left in `buf`.
async fn read_octet_count<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Option<usize>>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let available = reader.fill_buf().await?;
        let Some(&b) = available.first() else {
            return Ok(None);
        };

        if b.is_ascii_digit() && buf.len() < MAX_COUNT_DIGITS {
            buf.push(b);
            reader.consume(1);
            continue;
        }

        if b == b' ' {
            let len = std::str::from_utf8(buf)
                .ok()
                .and_then(|digits| digits.parse::<usize>().ok());
            if let Some(len) = len {
                reader.consume(1);
                buf.clear();
                return Ok(Some(len));
            }
        }
        return Ok(None);
    }
}

/// Read exactly `len` bytes, discarding them if over the limit
async fn read_counted<R>(reader: &mut R, buf: &mut Vec<u8>, len: usize, max_size: usize) -> io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    if len > max_size {
        let mut remaining = len;
        while remaining > 0 {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(Frame::Eof);
            }
            let n = available.len().min(remaining);
            reader.consume(n);
            remaining -= n;
        }
        return Ok(Frame::TooLong);
    }

    buf.resize(len, 0);
    match reader.read_exact(buf).await {
        Ok(_) => Ok(Frame::Message(len)),
        // Sender closed mid-frame
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            buf.clear();
            Ok(Frame::Eof)
        }
        Err(e) => Err(e),
    }
}

/// Read a line with bounded memory allocation
///
/// - Reads until newline or `max_size` bytes (counting anything already in `buf`)
/// - If `max_size` is reached without newline, consumes the rest of the line
/// - A final unterminated line before EOF is returned as a frame
async fn read_bounded_line<R>(reader: &mut R, buf: &mut Vec<u8>, max_size: usize) -> io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    let mut total_bytes = buf.len();
    let mut found_newline = false;
    let mut exceeded_limit = buf.len() > max_size;

    loop {
        let available = reader.fill_buf().await?;

        if available.is_empty() {
            if buf.is_empty() && !exceeded_limit {
                return Ok(Frame::Eof);
            }
            break;
        }

        let (bytes_to_consume, done) = match available.iter().position(|&b| b == b'\n') {
            Some(pos) => (pos + 1, true),
            None => (available.len(), false),
        };

        // The terminator does not count against the limit
        let content = if done { bytes_to_consume - 1 } else { bytes_to_consume };
        let space_remaining = max_size.saturating_sub(buf.len());

        if !exceeded_limit && content <= space_remaining {
            buf.extend_from_slice(&available[..bytes_to_consume]);
        } else if !exceeded_limit {
            exceeded_limit = true;
        }

        total_bytes += bytes_to_consume;
        reader.consume(bytes_to_consume);

        if done {
            found_newline = true;
            break;
        }
    }

    if exceeded_limit {
        if !found_newline {
            loop {
                let available = reader.fill_buf().await?;
                if available.is_empty() {
                    break;
                }
                if let Some(pos) = available.iter().position(|&b| b == b'\n') {
                    reader.consume(pos + 1);
                    break;
                }
                let len = available.len();
                reader.consume(len);
            }
        }
        buf.clear();
        return Ok(Frame::TooLong);
    }

    Ok(Frame::Message(total_bytes))
}

#[cfg(test)]
#[path = "framing_test.rs"]
mod framing_test;
