//! # Routegate Core
//!
//! Query validation and dispatch gateway for a routing engine.
//!
//! ## Architecture
//!
//! A route query travels through two validation phases before it ever
//! reaches the engine:
//!
//! ```text
//! query text -> parser -> RouteParameters -> validator -> engine -> RouteResult
//!                 |                              |
//!            InvalidQuery                  InvalidOptions
//! ```
//!
//! Both failures come back as JSON documents with a `code` and a `message`.
//! Successful JSON results carry the engine's wall-clock time in
//! `durationNanos`.
//!
//! ## Modules
//!
//! - `params` - Decoded route request
//! - `parser` - Query grammar and the `QueryParser` boundary
//! - `validation` - Cross-parameter consistency checks
//! - `result` - Document / binary buffer result container
//! - `engine` - `RoutingEngine` capability and the great-circle reference engine
//! - `service` - Parse, validate, dispatch and time one query
//! - `json` - Wire encoding of results
//! - `router` - Endpoint matching using matchit (radix trie) and profile registry
//! - `request` - Transport-neutral request view
//! - `middleware` - Request/response middleware system
//! - `server` - HTTP server built on Hyper
//! - `error` - Error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod engine;
pub mod error;
pub mod json;
pub mod middleware;
pub mod params;
pub mod parser;
pub mod request;
pub mod result;
pub mod router;
pub mod server;
pub mod service;
pub mod validation;

pub use engine::{GreatCircleEngine, RoutingEngine, Status};
pub use error::{Error, Result};
pub use json::encode_result;
pub use middleware::{CorsMiddleware, LoggingMiddleware, Middleware, MiddlewareChain};
pub use params::{
    Approach, Bearing, Coordinate, Geometries, OutputFormat, Overview, Radius, RouteParameters,
};
pub use parser::{GrammarParser, QueryParser};
pub use request::GatewayRequest;
pub use result::{Document, RouteResult};
pub use router::{Endpoint, Method, Router};
pub use server::{GatewayResponse, Server, ServerConfig};
pub use service::RouteService;
pub use validation::{validate, OptionError, ValidationCode, ValidationResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
