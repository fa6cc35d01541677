//! Connection acceptor and per-connection lifecycle.
//!
//! [`HttpServer::start`] binds the listener and spawns the accept loop. Each
//! accepted connection gets one task that frames a single request, dispatches
//! it through the shared [`Router`], writes the response, and closes.
//!
//! Concurrency is bounded by a semaphore: the loop acquires a permit *before*
//! accepting, so once `max_connections` requests are in flight new clients
//! queue in the kernel backlog instead of spawning more tasks.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use facelift_core::ServerConfig;
use http::StatusCode;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Semaphore, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, timeout_at};
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::error::{FramingError, ServerError};
use crate::handlers::error_response;
use crate::reader::RequestReader;
use crate::response::write_response;
use crate::router::Router;

/// Per-connection limits, copied out of [`ServerConfig`] once at start.
#[derive(Debug, Clone, Copy)]
struct ConnectionSettings {
    max_request_size: usize,
    request_timeout: Duration,
    enable_cors: bool,
}

#[derive(Debug)]
struct Running {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
}

/// The embedded HTTP server.
#[derive(Debug)]
pub struct HttpServer {
    config: ServerConfig,
    router: Arc<Router>,
    running: Arc<AtomicBool>,
    handle: Option<Running>,
}

impl HttpServer {
    /// Create a stopped server that will dispatch through `router`.
    #[must_use]
    pub fn new(config: ServerConfig, router: Router) -> Self {
        Self {
            config,
            router: Arc::new(router),
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Bind the listener and start accepting connections.
    ///
    /// Returns the bound address, which differs from the configured one when
    /// the configured port is `0`.
    pub async fn start(&mut self) -> Result<SocketAddr, ServerError> {
        if let Some(handle) = &self.handle {
            return Err(ServerError::AlreadyRunning(handle.local_addr));
        }

        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

        let settings = ConnectionSettings {
            max_request_size: self.config.max_request_size,
            request_timeout: self.config.request_timeout(),
            enable_cors: self.config.enable_cors,
        };
        let permits = Arc::new(Semaphore::new(self.config.max_connections.max(1)));
        let (shutdown, shutdown_rx) = watch::channel(false);

        self.running.store(true, Ordering::SeqCst);
        let accept_task = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.router),
            settings,
            permits,
            shutdown_rx,
            Arc::clone(&self.running),
        ));

        info!(
            %local_addr,
            max_connections = self.config.max_connections,
            cors = self.config.enable_cors,
            "listening for connections"
        );

        self.handle = Some(Running {
            local_addr,
            shutdown,
            accept_task,
        });
        Ok(local_addr)
    }

    /// Stop accepting, close the listener, and wait for in-flight requests.
    ///
    /// Does nothing if the server is not running.
    pub async fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        // The receiver may already be gone if the loop exited on its own.
        let _ = handle.shutdown.send(true);
        if let Err(err) = handle.accept_task.await {
            error!(error = %err, "accept loop terminated abnormally");
        }
        self.running.store(false, Ordering::SeqCst);
        info!(local_addr = %handle.local_addr, "server stopped");
    }

    /// Whether the accept loop is live.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The bound address while running.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.handle.as_ref().map(|handle| handle.local_addr)
    }
}

async fn accept_loop(
    listener: TcpListener,
    router: Arc<Router>,
    settings: ConnectionSettings,
    permits: Arc<Semaphore>,
    mut shutdown: watch::Receiver<bool>,
    running: Arc<AtomicBool>,
) {
    let mut connections = JoinSet::new();

    loop {
        let permit = tokio::select! {
            permit = Arc::clone(&permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
            _ = shutdown.changed() => break,
        };

        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let router = Arc::clone(&router);
                let span = info_span!(
                    "connection",
                    %peer_addr,
                    request_id = %Uuid::new_v4(),
                );
                connections.spawn(
                    async move {
                        let _permit = permit;
                        handle_connection(stream, router, settings).await;
                    }
                    .instrument(span),
                );
            }

            _ = shutdown.changed() => break,
        }

        while let Some(joined) = connections.try_join_next() {
            if let Err(err) = joined {
                error!(error = %err, "connection task panicked");
            }
        }
    }

    drop(listener);
    running.store(false, Ordering::SeqCst);
    info!(in_flight = connections.len(), "draining connections");

    while let Some(joined) = connections.join_next().await {
        if let Err(err) = joined {
            error!(error = %err, "connection task panicked");
        }
    }
}

/// Serve exactly one request on `stream`, then close it.
async fn handle_connection(stream: TcpStream, router: Arc<Router>, settings: ConnectionSettings) {
    let deadline = Instant::now() + settings.request_timeout;
    let mut reader = RequestReader::new(stream, settings.max_request_size);

    let read = timeout_at(deadline, reader.read_request())
        .await
        .unwrap_or(Err(FramingError::Timeout));

    let request = match read {
        Ok(request) => request,
        Err(FramingError::TooLarge { size, limit }) => {
            warn!(size, limit, "request exceeds size limit");
            let response = error_response(StatusCode::PAYLOAD_TOO_LARGE, "Request too large");
            finish(reader.into_inner(), &response, settings.enable_cors).await;
            return;
        }
        Err(err) => {
            debug!(error = %err, "dropping connection");
            return;
        }
    };

    let method = request.method.clone();
    let path = request.path.clone();
    let started = Instant::now();

    let response = match timeout_at(deadline, router.dispatch(request)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(%method, %path, "request timed out during dispatch");
            error_response(StatusCode::GATEWAY_TIMEOUT, "Request timed out")
        }
    };

    info!(
        %method,
        %path,
        status = response.status.as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request completed"
    );

    finish(reader.into_inner(), &response, settings.enable_cors).await;
}

async fn finish(mut stream: TcpStream, response: &crate::response::Response, cors: bool) {
    if let Err(err) = write_response(&mut stream, response, cors).await {
        debug!(error = %err, "failed to write response");
        return;
    }
    let _ = stream.shutdown().await;
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;
    use crate::request::Request;
    use crate::response::Response;
    use crate::static_files::StaticFiles;

    fn config() -> ServerConfig {
        ServerConfig::builder()
            .host("127.0.0.1".into())
            .port(0)
            .max_request_size(1024)
            .request_timeout_secs(1)
            .build()
    }

    fn router() -> Router {
        Router::builder(StaticFiles::new("/nonexistent-web-root", "index.html"))
            .get("/ping", |_req: Request| async {
                Response::text(StatusCode::OK, "text/plain", "pong")
            })
            .get("/slow", |_req: Request| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Response::empty(StatusCode::OK)
            })
            .build()
    }

    async fn roundtrip(addr: SocketAddr, raw: &[u8]) -> String {
        let mut stream = TcpStream::connect(addr).await.expect("connect");
        stream.write_all(raw).await.expect("write");
        let mut out = String::new();
        stream.read_to_string(&mut out).await.expect("read");
        out
    }

    #[tokio::test]
    async fn test_should_serve_request_and_close() {
        let mut server = HttpServer::new(config(), router());
        let addr = server.start().await.expect("start");
        assert!(server.is_running());
        assert_eq!(server.local_addr(), Some(addr));

        let out = roundtrip(addr, b"GET /ping HTTP/1.1\r\nHost: x\r\n\r\n").await;
        assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(out.contains("Access-Control-Allow-Origin: *\r\n"));
        assert!(out.contains("Connection: close\r\n"));
        assert!(out.ends_with("\r\n\r\npong"));

        server.stop().await;
        assert!(!server.is_running());
        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_should_refuse_second_start() {
        let mut server = HttpServer::new(config(), router());
        let addr = server.start().await.expect("start");
        assert!(matches!(
            server.start().await,
            Err(ServerError::AlreadyRunning(running)) if running == addr
        ));
        server.stop().await;
    }

    #[tokio::test]
    async fn test_should_fail_to_bind_taken_port() {
        let mut first = HttpServer::new(config(), router());
        let addr = first.start().await.expect("start");

        let taken = ServerConfig::builder()
            .host("127.0.0.1".into())
            .port(addr.port())
            .build();
        let mut second = HttpServer::new(taken, router());
        assert!(matches!(second.start().await, Err(ServerError::Bind { .. })));
        assert!(!second.is_running());

        first.stop().await;
    }

    #[tokio::test]
    async fn test_should_answer_413_for_oversized_body() {
        let mut server = HttpServer::new(config(), router());
        let addr = server.start().await.expect("start");

        let out = roundtrip(addr, b"POST /ping HTTP/1.1\r\nContent-Length: 4096\r\n\r\n").await;
        assert!(out.starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
        assert!(out.contains("\"error\""));

        server.stop().await;
    }

    #[tokio::test]
    async fn test_should_answer_504_when_dispatch_exceeds_deadline() {
        let mut server = HttpServer::new(config(), router());
        let addr = server.start().await.expect("start");

        let out = roundtrip(addr, b"GET /slow HTTP/1.1\r\n\r\n").await;
        assert!(out.starts_with("HTTP/1.1 504 Gateway Timeout\r\n"));

        server.stop().await;
    }

    #[tokio::test]
    async fn test_should_drop_connection_with_malformed_content_length() {
        let mut server = HttpServer::new(config(), router());
        let addr = server.start().await.expect("start");

        let out = roundtrip(addr, b"POST /ping HTTP/1.1\r\nContent-Length: abc\r\n\r\n").await;
        assert!(out.is_empty());

        // The server keeps serving afterwards.
        let out = roundtrip(addr, b"GET /ping HTTP/1.1\r\n\r\n").await;
        assert!(out.starts_with("HTTP/1.1 200 OK"));

        server.stop().await;
    }

    #[tokio::test]
    async fn test_should_drain_in_flight_requests_on_stop() {
        let mut server = HttpServer::new(config(), router());
        let addr = server.start().await.expect("start");

        let mut stream = TcpStream::connect(addr).await.expect("connect");
        // Give the accept loop a moment to hand the connection to a task.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let client = tokio::spawn(async move {
            stream
                .write_all(b"GET /ping HTTP/1.1\r\n\r\n")
                .await
                .expect("write");
            let mut out = String::new();
            stream.read_to_string(&mut out).await.expect("read");
            out
        });

        server.stop().await;
        let out = client.await.expect("client task");
        assert!(out.starts_with("HTTP/1.1 200 OK"));
    }
}
