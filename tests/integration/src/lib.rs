//! End-to-end tests for the Facelift server.
//!
//! Each test starts its own in-process server on an ephemeral loopback port,
//! with a throwaway web root, and talks to it over real sockets: `reqwest`
//! for ordinary requests and a raw `TcpStream` where the exact bytes on the
//! wire matter.
//!
//! ```text
//! cargo test -p facelift-integration
//! ```

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::{Arc, Once};
use std::time::Duration;

use facelift_core::ServerConfig;
use facelift_enhance::ImageEnhancer;
use facelift_http::{HttpServer, build_router};
use image::{ImageFormat, Rgb, RgbImage};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

static INIT: Once = Once::new();

/// Multipart boundary used by [`multipart_body`] callers.
pub const BOUNDARY: &str = "----FaceliftTestBoundary7MA4YWxk";

/// Contents of the default document in every test web root.
pub const INDEX_HTML: &str = "<!doctype html><title>Facelift</title><h1>Facelift</h1>";

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// A running server plus the temporary web root it serves.
#[derive(Debug)]
pub struct TestServer {
    server: HttpServer,
    addr: SocketAddr,
    _web_root: tempfile::TempDir,
}

impl TestServer {
    /// Start a server with default settings.
    pub async fn start() -> Self {
        Self::start_with(|builder| builder).await
    }

    /// Start a server after adjusting its configuration.
    pub async fn start_with(adjust: impl FnOnce(ServerConfig) -> ServerConfig) -> Self {
        init_tracing();

        let web_root = tempfile::tempdir().expect("create web root");
        std::fs::write(web_root.path().join("index.html"), INDEX_HTML).expect("write index");
        std::fs::write(web_root.path().join("app.js"), "console.log('facelift');")
            .expect("write script");

        let base = ServerConfig::builder()
            .host("127.0.0.1".into())
            .port(0)
            .web_root(web_root.path().display().to_string())
            .build();
        let config = adjust(base);

        let router = build_router(&config, Arc::new(ImageEnhancer::default()));
        let mut server = HttpServer::new(config, router);
        let addr = server.start().await.expect("start server");

        Self {
            server,
            addr,
            _web_root: web_root,
        }
    }

    /// Bound address.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Stop the server and wait for it to drain.
    pub async fn shutdown(mut self) {
        self.server.stop().await;
        assert!(!self.server.is_running());
    }
}

/// An HTTP client that never reuses connections (the server closes them).
#[must_use]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(30))
        .build()
        .expect("build client")
}

/// A `width` x `height` PNG with a simple gradient.
#[must_use]
pub fn tiny_png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 23 % 256) as u8, (y * 41 % 256) as u8, 128])
    });
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

/// Build a `multipart/form-data` body from `(disposition params, value)` pairs.
///
/// `disposition` is everything after `form-data; `, e.g. `name="image"`.
#[must_use]
pub fn multipart_body(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (disposition, value) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; {disposition}\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// The `Content-Type` matching [`multipart_body`].
#[must_use]
pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

/// Send `chunks` over one raw connection, pausing between writes, and read
/// until the server closes it.
pub async fn raw_exchange(addr: SocketAddr, chunks: &[&[u8]], pause: Duration) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    for (i, chunk) in chunks.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(pause).await;
        }
        stream.write_all(chunk).await.expect("write chunk");
    }
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.expect("read response");
    out
}

/// Split a raw response into its header block and body.
#[must_use]
pub fn split_response(raw: &[u8]) -> (String, Vec<u8>) {
    let end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("header terminator");
    (
        String::from_utf8_lossy(&raw[..end]).into_owned(),
        raw[end + 4..].to_vec(),
    )
}

mod test_cors;
mod test_enhance;
mod test_framing;
mod test_static;
mod test_status;
