//! # Route Service
//!
//! Parse, validate, dispatch. Every path out of [`RouteService::run_query`]
//! yields a well-formed [`RouteResult`] and a [`Status`]:
//!
//! - malformed text: `InvalidQuery` with the absolute position
//! - inconsistent options: `InvalidOptions` with the first violation
//! - otherwise whatever the engine produced, plus `durationNanos` for
//!   document results
//!
//! Binary results never receive `durationNanos`. Their layout is fixed by
//! the engine and has no slot for it.

use crate::engine::{RoutingEngine, Status};
use crate::params::OutputFormat;
use crate::parser::{GrammarParser, QueryParser};
use crate::result::RouteResult;
use crate::validation::validate;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

/// Error code for queries that do not parse
pub const INVALID_QUERY: &str = "InvalidQuery";

/// Error code for queries that parse but are inconsistent
pub const INVALID_OPTIONS: &str = "InvalidOptions";

/// Document field carrying engine time in nanoseconds
pub const DURATION_FIELD: &str = "durationNanos";

/// Route request handler bound to one engine
///
/// Cheap to clone; the engine and parser are shared.
#[derive(Clone)]
pub struct RouteService {
    engine: Arc<dyn RoutingEngine>,
    parser: Arc<dyn QueryParser>,
}

impl std::fmt::Debug for RouteService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteService")
            .field("engine", &self.engine.name())
            .finish_non_exhaustive()
    }
}

impl RouteService {
    /// Create a service using the default query grammar
    #[must_use]
    pub fn new(engine: Arc<dyn RoutingEngine>) -> Self {
        Self {
            engine,
            parser: Arc::new(GrammarParser::new()),
        }
    }

    /// Replace the query parser
    #[must_use]
    pub fn with_parser(mut self, parser: Arc<dyn QueryParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Handle one route query
    ///
    /// `prefix_length` is the offset of `query` inside the original request
    /// and only affects the position reported for malformed queries.
    pub fn run_query(&self, prefix_length: usize, query: &str) -> (Status, RouteResult) {
        let (parameters, end) = self.parser.parse(query);
        let parameters = match parameters {
            Some(parameters) if end == query.len() => parameters,
            _ => {
                let position = prefix_length + end;
                debug!(position, "malformed route query");
                return (
                    Status::Error,
                    RouteResult::error(
                        INVALID_QUERY,
                        format!("Query string malformed close to position {position}"),
                    ),
                );
            }
        };

        if let Err(err) = validate(&parameters) {
            debug!(parameter = ?err.parameter, code = ?err.code, "invalid route options");
            return (Status::Error, RouteResult::error(INVALID_OPTIONS, err.message));
        }

        let mut result = match parameters.output_format() {
            OutputFormat::Flatbuffers => RouteResult::buffer(),
            OutputFormat::Json => RouteResult::document(),
        };

        let start = Instant::now();
        let status = self.engine.route(&parameters, &mut result);
        let elapsed = start.elapsed();

        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        if !result.insert(DURATION_FIELD, nanos) {
            trace!("binary result, duration not annotated");
        }

        debug!(
            engine = self.engine.name(),
            status = %status,
            coordinates = parameters.coordinates.len(),
            duration_nanos = nanos,
            "route dispatched"
        );

        (status, result)
    }
}
