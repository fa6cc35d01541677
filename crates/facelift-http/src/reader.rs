//! Incremental request framing.
//!
//! [`RequestReader`] accumulates bytes from a connection in two phases:
//!
//! 1. **Head**: read until the `\r\n\r\n` terminator appears, then parse the
//!    request line and headers.
//! 2. **Body**: if `Content-Length` is present, read until exactly that many
//!    bytes follow the terminator; otherwise the body is empty.
//!
//! The buffer is never interpreted as text past the header block, so binary
//! payloads survive untouched. Chunked transfer-encoding is not supported.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::FramingError;
use crate::request::{Request, RequestHead, parse_head};

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";
const READ_CHUNK: usize = 64 * 1024;

/// Reads one framed [`Request`] from an async byte stream.
#[derive(Debug)]
pub struct RequestReader<R> {
    io: R,
    buf: BytesMut,
    max_request_size: usize,
}

impl<R: AsyncRead + Unpin> RequestReader<R> {
    /// Wrap a stream, rejecting header blocks or bodies above `max_request_size`.
    pub fn new(io: R, max_request_size: usize) -> Self {
        Self {
            io,
            buf: BytesMut::with_capacity(READ_CHUNK),
            max_request_size,
        }
    }

    /// Read until a complete request is buffered and return it.
    ///
    /// Bytes beyond the announced `Content-Length` are left in the buffer.
    pub async fn read_request(&mut self) -> Result<Request, FramingError> {
        let (head, body_start) = self.read_head().await?;

        let body_len = head.content_length()?.unwrap_or(0);
        if body_len > self.max_request_size {
            return Err(FramingError::TooLarge {
                size: body_len,
                limit: self.max_request_size,
            });
        }

        let frame_len = body_start + body_len;
        while self.buf.len() < frame_len {
            self.fill().await?;
        }

        let mut frame = self.buf.split_to(frame_len);
        let body = frame.split_off(body_start).freeze();
        Ok(Request::from_parts(head, body))
    }

    /// Give back the underlying stream (used to write the response).
    pub fn into_inner(self) -> R {
        self.io
    }

    async fn read_head(&mut self) -> Result<(RequestHead, usize), FramingError> {
        let mut scanned = 0;
        loop {
            if let Some(pos) = find_bytes(&self.buf[scanned..], HEAD_TERMINATOR) {
                let end = scanned + pos;
                if end > self.max_request_size {
                    return Err(self.too_large(end));
                }
                let head = parse_head(&String::from_utf8_lossy(&self.buf[..end]));
                return Ok((head, end + HEAD_TERMINATOR.len()));
            }
            if self.buf.len() > self.max_request_size {
                return Err(self.too_large(self.buf.len()));
            }
            // The terminator may straddle two reads.
            scanned = self.buf.len().saturating_sub(HEAD_TERMINATOR.len() - 1);
            self.fill().await?;
        }
    }

    async fn fill(&mut self) -> Result<(), FramingError> {
        self.buf.reserve(READ_CHUNK);
        let n = self.io.read_buf(&mut self.buf).await?;
        if n == 0 {
            return Err(FramingError::ConnectionClosed {
                received: self.buf.len(),
            });
        }
        Ok(())
    }

    fn too_large(&self, size: usize) -> FramingError {
        FramingError::TooLarge {
            size,
            limit: self.max_request_size,
        }
    }
}

/// Find the first occurrence of `needle` in `haystack`.
pub(crate) fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
