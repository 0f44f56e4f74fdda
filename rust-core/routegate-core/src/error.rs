//! # Error Handling
//!
//! Centralized error types for routegate core.
//! Uses `thiserror` for ergonomic error definitions.
//!
//! Only infrastructure faults live here. A malformed or inconsistent query is
//! not an `Error`: the route service turns it into an error document.

use thiserror::Error;

/// Result type alias for routegate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the routegate runtime
#[derive(Error, Debug)]
pub enum Error {
    /// Server failed to bind to the specified address
    #[error("Failed to bind server to {address}: {source}")]
    BindError {
        /// The address we tried to bind to
        address: String,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Router failed to match the requested path
    #[error("No route found for path: {path}")]
    RouteNotFound {
        /// The path that wasn't matched
        path: String,
    },

    /// Invalid route pattern provided
    #[error("Invalid route pattern: {pattern}: {reason}")]
    InvalidRoutePattern {
        /// The invalid pattern
        pattern: String,
        /// Reason for invalidity
        reason: String,
    },

    /// A profile was registered twice
    #[error("Profile already registered: {profile}")]
    DuplicateProfile {
        /// The profile name
        profile: String,
    },

    /// The blocking engine task was cancelled or panicked
    #[error("Engine task failed: {0}")]
    EngineTask(#[from] tokio::task::JoinError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
