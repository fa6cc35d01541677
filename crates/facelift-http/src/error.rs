//! Error types for the HTTP layer.

use std::net::SocketAddr;

/// Failure to assemble a complete request from a connection.
///
/// None of these produce a response except [`FramingError::TooLarge`], which
/// is answered with `413` before the connection is closed.
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    /// The peer closed the connection before a full request arrived.
    #[error("connection closed after {received} bytes, before the request was complete")]
    ConnectionClosed {
        /// Bytes received before the close.
        received: usize,
    },

    /// The `Content-Length` header is not a non-negative integer.
    #[error("invalid Content-Length value: {0:?}")]
    InvalidContentLength(String),

    /// The header block or announced body exceeds the configured limit.
    #[error("request of {size} bytes exceeds the {limit} byte limit")]
    TooLarge {
        /// Offending size (header bytes read so far, or announced body length).
        size: usize,
        /// Configured limit.
        limit: usize,
    },

    /// The request deadline passed while reading.
    #[error("timed out reading request")]
    Timeout,

    /// Socket error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Server lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listening socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that failed to bind.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// [`HttpServer::start`](crate::server::HttpServer::start) was called on a running server.
    #[error("server is already running on {0}")]
    AlreadyRunning(SocketAddr),
}
