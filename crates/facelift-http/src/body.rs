//! Response body types.
//!
//! [`ResponseBody`] is either text or raw bytes, never both. The writer emits
//! text inline with the header block and writes binary bodies separately from
//! their own buffer.

use bytes::Bytes;

/// Response body supporting text and binary modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    /// Textual payload: HTML pages, JSON documents.
    Text(String),
    /// Binary payload: static files, encoded images.
    Binary(Bytes),
}

impl Default for ResponseBody {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl ResponseBody {
    /// Create a text body.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Create a binary body.
    #[must_use]
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self::Binary(data.into())
    }

    /// Whether this is the binary variant.
    #[must_use]
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }

    /// Length in bytes of whichever variant is populated.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(s) => s.len(),
            Self::Binary(b) => b.len(),
        }
    }

    /// Whether the body has no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The body bytes, regardless of variant.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(s) => s.as_bytes(),
            Self::Binary(b) => b.as_ref(),
        }
    }
}
