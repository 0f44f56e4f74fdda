//! # JSON Serialization Module
//!
//! Wire encoding for result documents.
//!
//! Documents keep insertion order (`serde_json` with `preserve_order`), so
//! `code` stays in front of engine fields and `durationNanos` comes last.

use crate::error::Result;
use crate::result::RouteResult;
use bytes::Bytes;

/// Content type for document bodies
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Content type for binary bodies
pub const FLATBUFFERS_CONTENT_TYPE: &str = "application/x-flatbuffers";

/// Encode a finished result as an HTTP body and its content type
///
/// # Errors
///
/// Returns `Error::Json` if the document cannot be serialized
pub fn encode_result(result: RouteResult) -> Result<(&'static str, Bytes)> {
    match result {
        RouteResult::Document(doc) => Ok((JSON_CONTENT_TYPE, Bytes::from(serde_json::to_vec(&doc)?))),
        RouteResult::Buffer(buf) => Ok((FLATBUFFERS_CONTENT_TYPE, buf.freeze())),
    }
}
