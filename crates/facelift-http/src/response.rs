//! Response model and wire serialization.
//!
//! A [`Response`] keeps its headers in insertion order so the writer emits them
//! exactly as handlers set them. [`write_response`] frames the whole thing:
//!
//! ```text
//! HTTP/1.1 <code> <reason>
//! [CORS headers, when enabled]
//! <handler headers, in order>
//! Content-Length: <body length>
//! Connection: close
//!
//! <body>
//! ```

use bytes::Bytes;
use http::StatusCode;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::body::ResponseBody;

/// CORS headers added to every response when CORS is enabled.
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

/// An HTTP response under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code. The reason phrase is derived from it.
    pub status: StatusCode,
    headers: Vec<(String, String)>,
    /// Body: text or binary.
    pub body: ResponseBody,
}

impl Default for Response {
    fn default() -> Self {
        Self::empty(StatusCode::OK)
    }
}

impl Response {
    /// A response with no headers and an empty body.
    #[must_use]
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: ResponseBody::default(),
        }
    }

    /// A text response with the given `Content-Type`.
    #[must_use]
    pub fn text(status: StatusCode, content_type: &str, body: impl Into<String>) -> Self {
        Self::empty(status)
            .with_header("Content-Type", content_type)
            .with_body(ResponseBody::text(body))
    }

    /// An HTML response.
    #[must_use]
    pub fn html(status: StatusCode, body: impl Into<String>) -> Self {
        Self::text(status, "text/html; charset=utf-8", body)
    }

    /// A JSON response serialized from `value`.
    ///
    /// Serialization of the value types used by the handlers cannot fail; if it
    /// ever does, the body falls back to an empty object.
    #[must_use]
    pub fn json(status: StatusCode, value: &impl Serialize) -> Self {
        let body = serde_json::to_string(value).unwrap_or_else(|err| {
            tracing::error!(error = %err, "failed to serialize JSON response body");
            String::from("{}")
        });
        Self::text(status, "application/json", body)
    }

    /// A binary response with the given `Content-Type`.
    #[must_use]
    pub fn binary(status: StatusCode, content_type: &str, data: impl Into<Bytes>) -> Self {
        Self::empty(status)
            .with_header("Content-Type", content_type)
            .with_body(ResponseBody::binary(data))
    }

    /// Builder-style [`Response::set_header`].
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    /// Replace the body.
    #[must_use]
    pub fn with_body(mut self, body: ResponseBody) -> Self {
        self.body = body;
        self
    }

    /// Set a header. An existing header with the same name (ignoring case) is
    /// replaced in place, keeping its position.
    pub fn set_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value.to_owned(),
            None => self.headers.push((name.to_owned(), value.to_owned())),
        }
    }

    /// Look up a header, ignoring ASCII case in the name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Headers in insertion order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Canonical reason phrase for the status code.
    #[must_use]
    pub fn status_text(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("Unknown")
    }
}

/// Serialize the status line, header block, and (for text bodies) the body.
///
/// Binary bodies are not included; [`write_response`] sends them separately.
#[must_use]
pub fn serialize_head(response: &Response, cors: bool) -> String {
    let mut out = format!(
        "HTTP/1.1 {} {}\r\n",
        response.status.as_u16(),
        response.status_text()
    );
    if cors {
        for (name, value) in CORS_HEADERS {
            push_header(&mut out, name, value);
        }
    }
    for (name, value) in response.headers() {
        push_header(&mut out, name, value);
    }
    push_header(&mut out, "Content-Length", &response.body.len().to_string());
    push_header(&mut out, "Connection", "close");
    out.push_str("\r\n");
    if let ResponseBody::Text(text) = &response.body {
        out.push_str(text);
    }
    out
}

/// Write a complete response to `writer` and flush it.
pub async fn write_response<W>(writer: &mut W, response: &Response, cors: bool) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(serialize_head(response, cors).as_bytes())
        .await?;
    if let ResponseBody::Binary(data) = &response.body {
        writer.write_all(data).await?;
    }
    writer.flush().await
}

fn push_header(out: &mut String, name: &str, value: &str) {
    out.push_str(name);
    out.push_str(": ");
    out.push_str(value);
    out.push_str("\r\n");
}
