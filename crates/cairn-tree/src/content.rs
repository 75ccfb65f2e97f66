//! Page content in raw and parsed form.
//!
//! A page holds its content either as raw text/bytes or as a parsed
//! [`Document`]. Exactly one form is authoritative; the other is a memoized
//! view of it:
//!
//! | Operation          | raw                 | document              |
//! |--------------------|---------------------|-----------------------|
//! | `set_raw`          | replaced            | dropped               |
//! | `set_document`     | dropped             | replaced              |
//! | `raw` (doc only)   | serialized, kept    | kept                  |
//! | `document` (raw)   | kept                | parsed, kept          |
//! | `document_mut`     | dropped             | parsed if needed      |
//!
//! Every transition is a plain assignment, so a failed parse never leaves a
//! mix of old and new state behind.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::document::Document;

/// Raw content as produced by loaders or renderers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawContent {
    /// UTF-8 text.
    Text(Arc<str>),
    /// Binary payload.
    Bytes(Arc<[u8]>),
}

impl RawContent {
    /// Content as bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }

    /// Content as text, if it is valid UTF-8.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Bytes(bytes) => std::str::from_utf8(bytes).ok(),
        }
    }

    /// SHA-256 of the content, hex encoded.
    #[must_use]
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl From<&str> for RawContent {
    fn from(text: &str) -> Self {
        Self::Text(Arc::from(text))
    }
}

impl From<String> for RawContent {
    fn from(text: String) -> Self {
        Self::Text(Arc::from(text))
    }
}

impl From<Vec<u8>> for RawContent {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Arc::from(bytes))
    }
}

/// Content slot of a page.
#[derive(Clone, Debug, Default)]
pub struct Content {
    raw: Option<RawContent>,
    document: Option<Document>,
}

impl Content {
    /// Replace with raw content, dropping any parsed document.
    pub fn set_raw(&mut self, raw: RawContent) {
        *self = Self {
            raw: Some(raw),
            document: None,
        };
    }

    /// Replace with a parsed document, dropping any raw content.
    pub fn set_document(&mut self, document: Document) {
        *self = Self {
            raw: None,
            document: Some(document),
        };
    }

    /// Remove all content.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Check if neither form is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_none() && self.document.is_none()
    }

    /// Raw content, serializing and memoizing a document-only slot.
    pub fn raw(&mut self) -> Option<&RawContent> {
        if self.raw.is_none()
            && let Some(document) = &self.document
        {
            self.raw = Some(RawContent::from(document.to_html()));
        }
        self.raw.as_ref()
    }

    /// Raw content without memoizing.
    ///
    /// Serializes the document on every call when only the document is held.
    #[must_use]
    pub fn snapshot(&self) -> Option<RawContent> {
        match (&self.raw, &self.document) {
            (Some(raw), _) => Some(raw.clone()),
            (None, Some(document)) => Some(RawContent::from(document.to_html())),
            (None, None) => None,
        }
    }

    /// Parsed document, parsing and memoizing raw content when `parse` is set.
    ///
    /// Returns `None` when there is no document and `parse` is false, when the
    /// raw content is not text, or when the markup cannot be parsed.
    pub fn document(&mut self, parse: bool) -> Option<&Document> {
        if self.document.is_none() && parse {
            self.document = self.parse_raw();
        }
        self.document.as_ref()
    }

    /// Mutable parsed document. The raw memo is dropped, so the next
    /// [`raw`](Self::raw) reflects any edits.
    pub fn document_mut(&mut self, parse: bool) -> Option<&mut Document> {
        if self.document.is_none() && parse {
            self.document = self.parse_raw();
        }
        if self.document.is_some() {
            self.raw = None;
        }
        self.document.as_mut()
    }

    fn parse_raw(&self) -> Option<Document> {
        let text = self.raw.as_ref()?.as_text()?;
        match Document::parse(text) {
            Ok(document) => Some(document),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse HTML content");
                None
            }
        }
    }
}
