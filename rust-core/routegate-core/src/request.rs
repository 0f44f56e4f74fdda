//! # Gateway Request
//!
//! Transport-neutral view of an incoming request.
//!
//! The request target is split once at the first `?`. The part after it is
//! the route query, and its offset in the target is the prefix length used
//! for error positions. Requests that carry the coordinate list as the last
//! path segment route from that segment instead, see [`GatewayRequest::path_query`].

use crate::router::Method;
use hyper::header::{HeaderMap, HeaderName, HeaderValue};

/// Incoming request as the gateway sees it
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    /// HTTP method
    pub method: Method,
    /// Request path (without query string)
    pub path: String,
    /// Raw query string, exactly as received
    query: Option<String>,
    /// Request headers
    headers: HeaderMap,
}

impl GatewayRequest {
    /// Create a request from a method and a request target (`/path?query`)
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (target.to_string(), None),
        };

        Self {
            method,
            path,
            query,
            headers: HeaderMap::new(),
        }
    }

    /// Create from the head of a hyper request
    #[must_use]
    pub fn from_hyper<B>(method: Method, req: &hyper::Request<B>) -> Self {
        let uri = req.uri();
        Self {
            method,
            path: uri.path().to_string(),
            query: uri.query().map(String::from),
            headers: req.headers().clone(),
        }
    }

    /// Raw query string, empty when the target has none
    #[must_use]
    pub fn query_text(&self) -> &str {
        self.query.as_deref().unwrap_or("")
    }

    /// Offset of the query text within the request target
    ///
    /// Without a `?` the (empty) query sits at the end of the path.
    #[must_use]
    pub fn prefix_length(&self) -> usize {
        match self.query {
            Some(_) => self.path.len() + 1,
            None => self.path.len(),
        }
    }

    /// Route text for a target whose last path segment is `coordinates`
    ///
    /// Returns the segment followed by `?` and the raw query, together with
    /// the segment's offset in the target, so positions in the text map
    /// straight back onto what the client sent.
    #[must_use]
    pub fn path_query(&self, coordinates: &str) -> (usize, String) {
        let start = self.path.len().saturating_sub(coordinates.len());
        let mut text = coordinates.to_string();
        if let Some(query) = self.query.as_deref().filter(|q| !q.is_empty()) {
            text.push('?');
            text.push_str(query);
        }
        (start, text)
    }

    /// Get a header value by name (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Set or override a header
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let (Ok(n), Ok(v)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(n, v);
        }
    }
}
