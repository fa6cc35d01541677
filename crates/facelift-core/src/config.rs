//! Server configuration.
//!
//! Provides [`ServerConfig`] for configuring the embedded HTTP server.
//! Values are loaded from environment variables; anything unset or unparseable
//! keeps its default.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8084;

/// Default cap on a single request (header block plus body), 50 MiB.
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 50 * 1024 * 1024;

/// Default number of enhancements allowed to run at once.
pub const DEFAULT_MAX_CONCURRENT_ENHANCEMENTS: usize = 4;

/// Embedded HTTP server configuration.
///
/// # Examples
///
/// ```
/// use facelift_core::config::ServerConfig;
///
/// let config = ServerConfig::default();
/// assert_eq!(config.port, 8084);
/// assert!(config.enable_cors);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Interface to bind (e.g. `"0.0.0.0"`).
    #[builder(default = String::from("0.0.0.0"))]
    pub host: String,

    /// Port to listen on. `0` binds an ephemeral port.
    #[builder(default = DEFAULT_PORT)]
    pub port: u16,

    /// Directory static files are served from.
    #[builder(default = String::from("web"))]
    pub web_root: String,

    /// Document served for `/`, relative to the web root.
    #[builder(default = String::from("index.html"))]
    pub default_document: String,

    /// Whether CORS headers are added to every response.
    #[builder(default = true)]
    pub enable_cors: bool,

    /// Maximum accepted request size in bytes (header block or announced body).
    #[builder(default = DEFAULT_MAX_REQUEST_SIZE)]
    pub max_request_size: usize,

    /// Maximum number of connections served concurrently.
    #[builder(default = 256)]
    pub max_connections: usize,

    /// Enhancements allowed to run at once. A slot is held until the pipeline
    /// returns, even if the request that started it has already timed out.
    #[builder(default = DEFAULT_MAX_CONCURRENT_ENHANCEMENTS)]
    pub max_concurrent_enhancements: usize,

    /// Deadline, in seconds, for reading and answering a single request.
    #[builder(default = 60)]
    pub request_timeout_secs: u64,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Server name reported by the status endpoint.
    #[builder(default = String::from("Facelift Enhancement Server"))]
    pub server_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: DEFAULT_PORT,
            web_root: String::from("web"),
            default_document: String::from("index.html"),
            enable_cors: true,
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
            max_connections: 256,
            max_concurrent_enhancements: DEFAULT_MAX_CONCURRENT_ENHANCEMENTS,
            request_timeout_secs: 60,
            log_level: String::from("info"),
            server_name: String::from("Facelift Enhancement Server"),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `FACELIFT_HOST` | `0.0.0.0` |
    /// | `FACELIFT_PORT` | `8084` |
    /// | `WEB_ROOT` | `web` |
    /// | `DEFAULT_DOCUMENT` | `index.html` |
    /// | `ENABLE_CORS` | `true` |
    /// | `MAX_REQUEST_SIZE` | `52428800` |
    /// | `MAX_CONNECTIONS` | `256` |
    /// | `MAX_CONCURRENT_ENHANCEMENTS` | `4` |
    /// | `REQUEST_TIMEOUT_SECS` | `60` |
    /// | `LOG_LEVEL` | `info` |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// [`ServerConfig::from_env`] delegates here; tests pass a closure over a
    /// fixed map instead of mutating the process environment.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("FACELIFT_HOST") {
            config.host = v;
        }
        if let Some(n) = lookup("FACELIFT_PORT").and_then(|v| v.parse().ok()) {
            config.port = n;
        }
        if let Some(v) = lookup("WEB_ROOT") {
            config.web_root = v;
        }
        if let Some(v) = lookup("DEFAULT_DOCUMENT") {
            config.default_document = v;
        }
        if let Some(v) = lookup("ENABLE_CORS") {
            config.enable_cors = parse_bool(&v);
        }
        if let Some(n) = lookup("MAX_REQUEST_SIZE").and_then(|v| v.parse().ok()) {
            config.max_request_size = n;
        }
        if let Some(n) = lookup("MAX_CONNECTIONS").and_then(|v| v.parse::<usize>().ok()) {
            config.max_connections = n.max(1);
        }
        if let Some(n) = lookup("MAX_CONCURRENT_ENHANCEMENTS").and_then(|v| v.parse::<usize>().ok()) {
            config.max_concurrent_enhancements = n.max(1);
        }
        if let Some(n) = lookup("REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.request_timeout_secs = n;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// The `host:port` string to bind.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The per-request deadline as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
