//! The parsed request model and request-head parsing.
//!
//! [`parse_head`] turns the header block (everything before `\r\n\r\n`) into
//! a [`RequestHead`]; the [`reader`](crate::reader) attaches the body once
//! framing completes.

use std::borrow::Cow;
use std::collections::HashMap;

use bytes::Bytes;
use percent_encoding::percent_decode_str;

use crate::error::FramingError;

/// A fully framed HTTP request.
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// Method as received, e.g. `"GET"`. Empty when the request line is malformed.
    pub method: String,
    /// Path with the query string removed. Empty when the request line is malformed.
    pub path: String,
    /// Protocol version token, e.g. `"HTTP/1.1"`. Not validated.
    pub version: String,
    /// Decoded query parameters; the last occurrence of a key wins.
    pub query: HashMap<String, String>,
    /// Headers keyed by name as received; the last occurrence of a name wins,
    /// compared without regard to ASCII case.
    pub headers: HashMap<String, String>,
    /// Raw body bytes.
    pub body: Bytes,
}

impl Request {
    /// Assemble a request from a parsed head and its body.
    #[must_use]
    pub fn from_parts(head: RequestHead, body: Bytes) -> Self {
        Self {
            method: head.method,
            path: head.path,
            version: head.version,
            query: head.query,
            headers: head.headers,
            body,
        }
    }

    /// Look up a header, ignoring ASCII case in the name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Look up a decoded query parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// The body as text, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Request line and headers, before the body is attached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHead {
    /// Method token.
    pub method: String,
    /// Path without the query string.
    pub path: String,
    /// Protocol version token.
    pub version: String,
    /// Decoded query parameters.
    pub query: HashMap<String, String>,
    /// Header map.
    pub headers: HashMap<String, String>,
    /// Every `Content-Length` value in arrival order, whatever the name's case.
    content_lengths: Vec<String>,
}

impl RequestHead {
    /// The announced body length, if a `Content-Length` header is present.
    ///
    /// Repeated `Content-Length` lines must agree; conflicting values are
    /// rejected so that the body length never depends on which one wins.
    pub fn content_length(&self) -> Result<Option<usize>, FramingError> {
        let mut announced: Option<usize> = None;
        for raw in &self.content_lengths {
            let value = raw
                .parse::<usize>()
                .map_err(|_| FramingError::InvalidContentLength(raw.clone()))?;
            if announced.is_some_and(|previous| previous != value) {
                return Err(FramingError::InvalidContentLength(raw.clone()));
            }
            announced = Some(value);
        }
        Ok(announced)
    }
}

/// Parse a header block (request line plus header lines).
///
/// A request line with fewer than three tokens yields an empty method and
/// path. Header parsing stops at the first blank line.
#[must_use]
pub fn parse_head(head: &str) -> RequestHead {
    let mut lines = head.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line));
    let mut parsed = RequestHead::default();

    if let Some(request_line) = lines.next() {
        let tokens: Vec<&str> = request_line.split_whitespace().collect();
        if let [method, target, version, ..] = tokens.as_slice() {
            parsed.method = (*method).to_owned();
            parsed.version = (*version).to_owned();
            match target.split_once('?') {
                Some((path, query)) => {
                    parsed.path = path.to_owned();
                    parsed.query = parse_query_params(query);
                }
                None => parsed.path = (*target).to_owned(),
            }
        }
    }

    for line in lines {
        if line.trim().is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let (name, value) = (name.trim(), value.trim());
            if name.eq_ignore_ascii_case("Content-Length") {
                parsed.content_lengths.push(value.to_owned());
            }
            parsed
                .headers
                .retain(|existing, _| !existing.eq_ignore_ascii_case(name));
            parsed.headers.insert(name.to_owned(), value.to_owned());
        }
    }

    parsed
}

/// Parse a raw query string into decoded pairs.
///
/// Pairs without `=` are skipped; duplicate keys keep the last value.
#[must_use]
pub fn parse_query_params(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (url_decode(key), url_decode(value)))
        .collect()
}

/// Decode a query component: `+` becomes a space, `%XX` becomes its byte.
///
/// Malformed escapes are kept verbatim and invalid UTF-8 is replaced.
#[must_use]
pub fn url_decode(s: &str) -> String {
    let spaced = s.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

fn find_header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
