//! # Validation Module
//!
//! Semantic checks on parsed route parameters.
//!
//! Parsing guarantees every value is well-formed on its own; this module
//! checks that the values agree with each other. Only the first violated
//! constraint is reported, and constraints are always checked in the same
//! order, so a given query always produces the same message:
//!
//! 1. `hints`, `bearings`, `radiuses`, `approaches` have 0 or N entries
//! 2. N is at least two

use crate::params::RouteParameters;
use serde::Serialize;
use std::fmt;

/// Message used when fewer than two coordinates are supplied
pub const TOO_FEW_COORDINATES_MSG: &str = "Number of coordinates needs to be at least two.";

/// Error code for categorizing validation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    /// A per-coordinate array does not line up with the coordinates
    ParameterSizeMismatch,
    /// Fewer than two coordinates
    TooFewCoordinates,
}

/// The first constraint a set of route parameters violates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionError {
    /// Offending parameter, when one can be named
    pub parameter: Option<&'static str>,
    /// Human-readable error message
    pub message: String,
    /// Machine-readable error code
    pub code: ValidationCode,
}

impl OptionError {
    /// Create a size mismatch error for `parameter`
    #[must_use]
    pub fn size_mismatch(parameter: &'static str, size: usize, coordinates: usize) -> Self {
        Self {
            parameter: Some(parameter),
            message: format!(
                "Number of elements in {parameter} size {size} does not match coordinate size {coordinates}"
            ),
            code: ValidationCode::ParameterSizeMismatch,
        }
    }

    /// Create the minimum-coordinates error
    #[must_use]
    pub fn too_few_coordinates() -> Self {
        Self {
            parameter: None,
            message: TOO_FEW_COORDINATES_MSG.to_string(),
            code: ValidationCode::TooFewCoordinates,
        }
    }
}

impl fmt::Display for OptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for OptionError {}

/// Result type for validation operations
pub type ValidationResult<T> = std::result::Result<T, OptionError>;

/// Check route parameters for consistency
///
/// # Errors
///
/// Returns the first violated constraint, in the order listed in the module
/// documentation.
pub fn validate(params: &RouteParameters) -> ValidationResult<()> {
    let coordinates = params.coordinates.len();

    if let Some((parameter, size)) = params
        .per_coordinate_lengths()
        .into_iter()
        .find(|(_, size)| *size != 0 && *size != coordinates)
    {
        return Err(OptionError::size_mismatch(parameter, size, coordinates));
    }

    if coordinates < 2 {
        return Err(OptionError::too_few_coordinates());
    }

    Ok(())
}
