//! Single-field `multipart/form-data` extraction.
//!
//! This is not a general multipart parser. [`find_part`] scans the body once,
//! part by part, and returns the first part whose `Content-Disposition` names
//! the requested field. Everything is byte-oriented so binary uploads are
//! never reinterpreted as text.

use std::borrow::Cow;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::reader::find_bytes;

/// Failure to extract the image payload from a request.
///
/// The `Display` text is returned to clients verbatim in the `error` field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MultipartError {
    /// No `Content-Type` header on the request.
    #[error("Invalid Content-Type, multipart boundary not found")]
    MissingContentType,

    /// The `Content-Type` is not multipart or carries no boundary.
    #[error("Invalid Content-Type, multipart boundary not found")]
    MissingBoundary,

    /// No part with the requested field name, or the part is empty.
    #[error("No image data found in request")]
    MissingPart(String),

    /// The part is neither valid base64 nor a file upload.
    #[error("Failed to decode base64 image data")]
    InvalidBase64,
}

/// One located part of a multipart body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Part<'a> {
    /// Raw part header block, without the terminating blank line.
    pub headers: &'a [u8],
    /// Part value, up to but excluding the line break before the next boundary.
    pub value: &'a [u8],
}

impl Part<'_> {
    /// Whether the part was sent as a file upload (`filename=` present).
    #[must_use]
    pub fn is_file(&self) -> bool {
        find_bytes(self.headers, b"filename=").is_some()
    }

    /// The value as text, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.value)
    }
}

/// Extract the boundary token from a `multipart/form-data` content type.
///
/// Surrounding quotes are stripped. Returns `None` for other media types or
/// when the `boundary` parameter is missing or empty.
#[must_use]
pub fn extract_boundary(content_type: &str) -> Option<String> {
    let mut params = content_type.split(';');
    let media_type = params.next()?.trim();
    if !media_type.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }

    params
        .filter_map(|param| param.trim().split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| value.trim().trim_matches('"').to_owned())
        .filter(|boundary| !boundary.is_empty())
}

/// Find the first part whose headers declare `name="<name>"`.
///
/// The value ends at the next `\r\n--<boundary>`; bodies using bare `\n` line
/// endings are matched with `\n--<boundary>` instead. An unterminated final
/// part runs to the end of the body.
#[must_use]
pub fn find_part<'a>(body: &'a [u8], boundary: &str, name: &str) -> Option<Part<'a>> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();
    let wanted = format!("name=\"{name}\"");

    let mut cursor = find_bytes(body, delimiter)? + delimiter.len();
    loop {
        let rest = &body[cursor..];
        if rest.starts_with(b"--") {
            return None;
        }

        let (headers_start, headers_end, value_start) = split_part_headers(rest)?;
        let headers = &rest[headers_start..headers_end];
        let after_headers = &rest[value_start..];
        let value_len = closing_delimiter(after_headers, delimiter);

        if declares_field(headers, wanted.as_bytes()) {
            return Some(Part {
                headers,
                value: &after_headers[..value_len],
            });
        }

        let next = find_bytes(&after_headers[value_len..], delimiter)?;
        cursor += value_start + value_len + next + delimiter.len();
    }
}

/// Remove a `data:<mime>;base64,` prefix, if present.
///
/// Only values starting with `data:` are touched, so binary uploads that
/// happen to contain a comma pass through unchanged.
#[must_use]
pub fn strip_data_url_prefix(value: &[u8]) -> &[u8] {
    if !value.starts_with(b"data:") {
        return value;
    }
    match value.iter().position(|&b| b == b',') {
        Some(comma) => &value[comma + 1..],
        None => value,
    }
}

/// Decode an image part into raw bytes.
///
/// The value is treated as base64 (optionally behind a data-URL prefix, with
/// embedded whitespace ignored). File uploads that are not base64 are taken
/// as raw bytes.
pub fn decode_payload(part: &Part<'_>) -> Result<Vec<u8>, MultipartError> {
    let payload = strip_data_url_prefix(part.value);
    let compact: Vec<u8> = payload
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if compact.is_empty() {
        return Err(MultipartError::MissingPart(String::from("image")));
    }

    match STANDARD.decode(&compact) {
        Ok(decoded) if !decoded.is_empty() => Ok(decoded),
        _ if part.is_file() => Ok(part.value.to_vec()),
        _ => Err(MultipartError::InvalidBase64),
    }
}

/// Locate the `image` field of a request body and decode it.
pub fn extract_image(content_type: Option<&str>, body: &[u8]) -> Result<Vec<u8>, MultipartError> {
    let content_type = content_type.ok_or(MultipartError::MissingContentType)?;
    let boundary = extract_boundary(content_type).ok_or(MultipartError::MissingBoundary)?;
    let part = find_part(body, &boundary, "image")
        .ok_or_else(|| MultipartError::MissingPart(String::from("image")))?;
    decode_payload(&part)
}

/// Returns (header start, header end, value start) relative to `rest`, where
/// `rest` begins right after a boundary delimiter.
fn split_part_headers(rest: &[u8]) -> Option<(usize, usize, usize)> {
    let headers_start = if rest.starts_with(b"\r\n") {
        2
    } else if rest.starts_with(b"\n") {
        1
    } else {
        0
    };
    let block = &rest[headers_start..];

    // Whichever terminator comes first ends this part's headers.
    let crlf = find_bytes(block, b"\r\n\r\n").map(|end| (end, 4));
    let lf = find_bytes(block, b"\n\n").map(|end| (end, 2));
    let (end, len) = match (crlf, lf) {
        (Some(crlf), Some(lf)) => {
            if crlf.0 <= lf.0 {
                crlf
            } else {
                lf
            }
        }
        (crlf, lf) => crlf.or(lf)?,
    };
    Some((headers_start, headers_start + end, headers_start + end + len))
}

/// Length of the value preceding the next boundary line.
fn closing_delimiter(value: &[u8], delimiter: &[u8]) -> usize {
    let mut crlf = b"\r\n".to_vec();
    crlf.extend_from_slice(delimiter);
    if let Some(pos) = find_bytes(value, &crlf) {
        return pos;
    }
    let mut lf = b"\n".to_vec();
    lf.extend_from_slice(delimiter);
    find_bytes(value, &lf).unwrap_or(value.len())
}

/// Whether `headers` contain `wanted` as a parameter of its own, so that
/// `name="image"` does not match inside `filename="image"`.
fn declares_field(headers: &[u8], wanted: &[u8]) -> bool {
    let mut offset = 0;
    while let Some(pos) = find_bytes(&headers[offset..], wanted) {
        let at = offset + pos;
        if at == 0 || !headers[at - 1].is_ascii_alphanumeric() {
            return true;
        }
        offset = at + 1;
    }
    false
}
