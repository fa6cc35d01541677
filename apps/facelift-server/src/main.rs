//! Facelift Server - image enhancement over a small embedded HTTP server.
//!
//! Serves the web UI from `WEB_ROOT`, reports liveness on `GET /status`, and
//! enhances uploaded images on `POST /enhance`.
//!
//! # Usage
//!
//! ```text
//! FACELIFT_PORT=8084 WEB_ROOT=./web facelift-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `FACELIFT_HOST` | `0.0.0.0` | Bind interface |
//! | `FACELIFT_PORT` | `8084` | Bind port |
//! | `WEB_ROOT` | `web` | Static file directory |
//! | `DEFAULT_DOCUMENT` | `index.html` | Document served for `/` |
//! | `ENABLE_CORS` | `true` | Add CORS headers to every response |
//! | `MAX_REQUEST_SIZE` | `52428800` | Request size limit in bytes |
//! | `MAX_CONNECTIONS` | `256` | Concurrent connection limit |
//! | `MAX_CONCURRENT_ENHANCEMENTS` | `4` | Enhancements running at once |
//! | `REQUEST_TIMEOUT_SECS` | `60` | Per-request deadline |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::sync::Arc;

use anyhow::{Context, Result};
use facelift_core::ServerConfig;
use facelift_enhance::ImageEnhancer;
use facelift_http::{HttpServer, build_router};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Server version reported in the startup log.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Address a local health probe should connect to.
fn probe_addr(config: &ServerConfig) -> String {
    let host = match config.host.as_str() {
        "0.0.0.0" | "" => "127.0.0.1",
        "::" => "::1",
        other => other,
    };
    if host.contains(':') {
        format!("[{host}]:{}", config.port)
    } else {
        format!("{host}:{}", config.port)
    }
}

/// Request `/status` and check the server reports itself ready.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET /status HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.starts_with("HTTP/1.1 200") && response.contains("\"status\":\"ready\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --health-check flag for Docker HEALTHCHECK.
    if std::env::args().any(|a| a == "--health-check") {
        let config = ServerConfig::from_env();
        let healthy = run_health_check(&probe_addr(&config)).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    let config = ServerConfig::from_env();

    init_tracing(&config.log_level)?;

    info!(
        bind = %config.bind_addr(),
        web_root = %config.web_root,
        cors = config.enable_cors,
        max_request_size = config.max_request_size,
        max_connections = config.max_connections,
        max_enhancements = config.max_concurrent_enhancements,
        version = VERSION,
        "starting Facelift Server",
    );

    let router = build_router(&config, Arc::new(ImageEnhancer::default()));
    let mut server = HttpServer::new(config, router);
    let addr = server
        .start()
        .await
        .context("failed to start HTTP server")?;

    info!(%addr, "ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("received shutdown signal, draining connections");

    server.stop().await;
    info!("all connections drained, exiting");

    Ok(())
}
