//! Embedded HTTP/1.1 server for the Facelift enhancement service.
//!
//! This crate speaks HTTP directly over tokio TCP sockets, without an HTTP
//! framework. It handles:
//!
//! - **Framing** ([`reader`]): Incremental, byte-oriented reading of one
//!   request per connection, completed by `Content-Length`.
//!
//! - **Parsing** ([`request`]): Request line, headers, and percent-decoded
//!   query parameters.
//!
//! - **Routing** ([`router`]): An immutable method and path table with a
//!   static file fallback ([`static_files`]) and CORS preflight handling.
//!
//! - **Multipart** ([`multipart`]): Extraction of a single named field
//!   (the uploaded image) from a `multipart/form-data` body.
//!
//! - **Handlers** ([`handlers`]): `/`, `/status`, and `/enhance`, the last of
//!   which calls into an [`EnhancementGateway`](facelift_core::EnhancementGateway).
//!
//! - **Responses** ([`response`], [`body`]): Ordered headers, text or binary
//!   bodies, and wire serialization.
//!
//! - **Server** ([`server`]): The accept loop with bounded concurrency,
//!   per-request deadlines, and graceful shutdown.
//!
//! # Architecture
//!
//! ```text
//! TcpListener (permit acquired before accept)
//!   -> connection task
//!     -> RequestReader (head, then Content-Length body)
//!     -> Router::dispatch
//!       -> OPTIONS preflight / exact route / static file / 404
//!     -> write_response (CORS, headers, Content-Length, Connection: close)
//!   <- socket closed
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use facelift_core::{EnhanceParams, EnhancedImage, EnhancementGateway, GatewayError, ServerConfig};
//! use facelift_http::{HttpServer, build_router};
//!
//! struct Passthrough;
//!
//! impl EnhancementGateway for Passthrough {
//!     fn enhance(&self, image: &[u8], _: &EnhanceParams) -> Result<EnhancedImage, GatewayError> {
//!         Ok(EnhancedImage {
//!             data: image.to_vec(),
//!             mime_type: "image/png".into(),
//!             faces_detected: 0,
//!             timings: Vec::new(),
//!             original_size: (0, 0),
//!             enhanced_size: (0, 0),
//!         })
//!     }
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::default();
//! let router = build_router(&config, Arc::new(Passthrough));
//! let mut server = HttpServer::new(config, router);
//! server.start().await?;
//! // ...
//! server.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod body;
pub mod error;
pub mod handlers;
pub mod multipart;
pub mod reader;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod static_files;

// Re-export key types for convenience.
pub use body::ResponseBody;
pub use error::{FramingError, ServerError};
pub use handlers::{AppState, build_router};
pub use multipart::MultipartError;
pub use reader::RequestReader;
pub use request::Request;
pub use response::{Response, write_response};
pub use router::{Handler, Router, RouterBuilder};
pub use server::HttpServer;
pub use static_files::StaticFiles;
