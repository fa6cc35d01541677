//! Static file serving from the web root.

use std::path::{Component, Path, PathBuf};

use http::StatusCode;
use mime::Mime;
use percent_encoding::percent_decode_str;
use tracing::debug;

use crate::response::Response;

const NOT_FOUND_PAGE: &str = "<html><head><title>404 Not Found</title></head>\
<body><h1>404 Not Found</h1><p>The requested resource was not found.</p></body></html>";

/// Serves files below a root directory.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    default_document: String,
}

impl StaticFiles {
    /// Serve files from `root`, answering `/` with `default_document`.
    pub fn new(root: impl Into<PathBuf>, default_document: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            default_document: default_document.into(),
        }
    }

    /// Answer a `GET` for `request_path`.
    ///
    /// Unreadable files and paths escaping the root yield a 404 HTML page.
    pub async fn serve(&self, request_path: &str) -> Response {
        let Some(path) = self.resolve(request_path) else {
            debug!(path = request_path, "rejected static path");
            return not_found();
        };

        match tokio::fs::read(&path).await {
            Ok(data) => {
                let mime = mime_type_for(&path);
                Response::binary(StatusCode::OK, mime.as_ref(), data)
            }
            Err(err) => {
                debug!(path = %path.display(), error = %err, "static file not readable");
                not_found()
            }
        }
    }

    /// Map a request path onto the filesystem, or `None` if it would leave the root.
    fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let decoded = percent_decode_str(request_path).decode_utf8().ok()?;
        let relative = decoded.trim_start_matches('/');
        let relative = if relative.is_empty() {
            self.default_document.as_str()
        } else {
            relative
        };

        let mut path = self.root.clone();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        Some(path)
    }
}

/// The 404 page returned for unknown paths.
#[must_use]
pub fn not_found() -> Response {
    Response::html(StatusCode::NOT_FOUND, NOT_FOUND_PAGE)
}

/// MIME type by file extension, defaulting to `application/octet-stream`.
#[must_use]
pub fn mime_type_for(path: &Path) -> Mime {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "html" | "htm" => mime::TEXT_HTML_UTF_8,
        "css" => mime::TEXT_CSS_UTF_8,
        "js" => mime::APPLICATION_JAVASCRIPT_UTF_8,
        "json" => mime::APPLICATION_JSON,
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "png" => mime::IMAGE_PNG,
        "gif" => mime::IMAGE_GIF,
        "svg" => mime::IMAGE_SVG,
        "ico" => "image/x-icon"
            .parse()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM),
        "webp" => "image/webp"
            .parse()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM),
        "txt" => mime::TEXT_PLAIN_UTF_8,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}
