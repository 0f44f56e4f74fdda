//! # Route Result
//!
//! Output container handed to the engine and returned to the caller.
//!
//! A request starts with an empty [`RouteResult::Document`]. Once the
//! requested format is known the service may replace it with a fresh
//! [`RouteResult::Buffer`]; the engine then writes into whichever variant it
//! receives.

use bytes::{Bytes, BytesMut};
use serde_json::{Map, Value};

/// Ordered key-value document (JSON object)
pub type Document = Map<String, Value>;

/// Output container for one request
#[derive(Debug, Clone, PartialEq)]
pub enum RouteResult {
    /// Structured document, used for errors and JSON responses
    Document(Document),
    /// Raw binary buffer with an engine-defined layout
    Buffer(BytesMut),
}

impl Default for RouteResult {
    fn default() -> Self {
        Self::document()
    }
}

impl RouteResult {
    /// Create an empty document container
    #[must_use]
    pub fn document() -> Self {
        Self::Document(Map::new())
    }

    /// Create an empty binary buffer container
    #[must_use]
    pub fn buffer() -> Self {
        Self::Buffer(BytesMut::new())
    }

    /// Build an error document with `code` and `message`
    #[must_use]
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        let mut doc = Map::new();
        doc.insert("code".to_string(), Value::from(code));
        doc.insert("message".to_string(), Value::from(message.into()));
        Self::Document(doc)
    }

    /// Check if this is a document
    #[must_use]
    pub const fn is_document(&self) -> bool {
        matches!(self, Self::Document(_))
    }

    /// Check if this is a binary buffer
    #[must_use]
    pub const fn is_buffer(&self) -> bool {
        matches!(self, Self::Buffer(_))
    }

    /// Get the document, if this is one
    #[must_use]
    pub const fn as_document(&self) -> Option<&Document> {
        match self {
            Self::Document(doc) => Some(doc),
            Self::Buffer(_) => None,
        }
    }

    /// Get the document mutably, if this is one
    pub fn as_document_mut(&mut self) -> Option<&mut Document> {
        match self {
            Self::Document(doc) => Some(doc),
            Self::Buffer(_) => None,
        }
    }

    /// Get the buffer mutably, if this is one
    pub fn as_buffer_mut(&mut self) -> Option<&mut BytesMut> {
        match self {
            Self::Buffer(buf) => Some(buf),
            Self::Document(_) => None,
        }
    }

    /// Look up a field of the document
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_document().and_then(|doc| doc.get(key))
    }

    /// The document's `code` field, if present and a string
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.get("code").and_then(Value::as_str)
    }

    /// Insert a field into the document
    ///
    /// Returns `false` and leaves the container untouched when it holds a
    /// buffer.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        match self.as_document_mut() {
            Some(doc) => {
                doc.insert(key.into(), value.into());
                true
            }
            None => false,
        }
    }

    /// Take the finished buffer, if this is one
    #[must_use]
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            Self::Buffer(buf) => Some(buf.freeze()),
            Self::Document(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BufMut;

    #[test]
    fn test_default_is_empty_document() {
        let result = RouteResult::default();
        assert!(result.is_document());
        assert_eq!(result.as_document().map(Map::len), Some(0));
    }

    #[test]
    fn test_error_document() {
        let result = RouteResult::error("InvalidQuery", "bad");
        assert_eq!(result.code(), Some("InvalidQuery"));
        assert_eq!(result.get("message"), Some(&Value::from("bad")));
    }

    #[test]
    fn test_document_keeps_insertion_order() {
        let mut result = RouteResult::document();
        assert!(result.insert("code", "Ok"));
        assert!(result.insert("routes", Value::Array(vec![])));
        assert!(result.insert("durationNanos", 12_u64));

        let keys: Vec<_> = result.as_document().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["code", "routes", "durationNanos"]);
    }

    #[test]
    fn test_buffer_rejects_fields() {
        let mut result = RouteResult::buffer();
        assert!(result.is_buffer());
        assert!(!result.insert("durationNanos", 1_u64));
        assert_eq!(result.get("durationNanos"), None);
    }

    #[test]
    fn test_buffer_into_bytes() {
        let mut result = RouteResult::buffer();
        result.as_buffer_mut().unwrap().put_u32_le(7);
        assert_eq!(result.into_bytes().unwrap().as_ref(), &[7, 0, 0, 0]);

        assert_eq!(RouteResult::document().into_bytes(), None);
    }
}
