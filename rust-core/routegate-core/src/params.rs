//! # Route Parameters
//!
//! Structured representation of one decoded route request.
//!
//! `coordinates` defines the reference cardinality N. The per-coordinate
//! arrays (`hints`, `bearings`, `radiuses`, `approaches`) are either empty,
//! meaning "unspecified for every coordinate", or carry exactly N entries,
//! each of which may itself be unspecified.

use std::fmt;

/// A geographic point in WGS84 degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Longitude in degrees, `[-180, 180]`
    pub lon: f64,
    /// Latitude in degrees, `[-90, 90]`
    pub lat: f64,
}

impl Coordinate {
    /// Create a coordinate from longitude and latitude
    #[must_use]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Whether both components are inside their WGS84 ranges
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (-180.0..=180.0).contains(&self.lon) && (-90.0..=90.0).contains(&self.lat)
    }
}

/// Allowed heading at a waypoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bearing {
    /// Heading in degrees, `[0, 360]`
    pub bearing: u16,
    /// Allowed deviation in degrees, `[0, 180]`
    pub range: u16,
}

/// Side of the road a waypoint may be approached from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approach {
    /// Arrive on the curb side
    Curb,
    /// Either side
    Unrestricted,
}

impl Approach {
    /// Parse an approach keyword
    #[must_use]
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "curb" => Some(Self::Curb),
            "unrestricted" => Some(Self::Unrestricted),
            _ => None,
        }
    }
}

/// Search radius around a waypoint, in meters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Radius {
    /// Snap within this many meters
    Meters(f64),
    /// No limit
    Unlimited,
}

/// Output encoding requested by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    /// Structured JSON document (default)
    #[default]
    Json,
    /// Compact binary buffer
    Flatbuffers,
}

impl OutputFormat {
    /// Parse a format selector (e.g., "json" from "format=json")
    #[must_use]
    pub fn from_specifier(s: &str) -> Option<Self> {
        match s {
            "json" => Some(Self::Json),
            "flatbuffers" => Some(Self::Flatbuffers),
            _ => None,
        }
    }

    /// Selector name as it appears in a query
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Flatbuffers => "flatbuffers",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Level of detail for the route overview geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overview {
    /// Simplified according to the zoom level it could be displayed at
    #[default]
    Simplified,
    /// Full geometry
    Full,
    /// No overview
    False,
}

/// Geometry encoding for route shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Geometries {
    /// Polyline with precision 5
    #[default]
    Polyline,
    /// Polyline with precision 6
    Polyline6,
    /// GeoJSON LineString
    GeoJson,
}

/// One decoded route request
#[derive(Debug, Clone, PartialEq)]
pub struct RouteParameters {
    /// Waypoints in visiting order
    pub coordinates: Vec<Coordinate>,
    /// Opaque snapping hints from earlier responses
    pub hints: Vec<Option<String>>,
    /// Heading restrictions per waypoint
    pub bearings: Vec<Option<Bearing>>,
    /// Snapping radius per waypoint
    pub radiuses: Vec<Option<Radius>>,
    /// Approach side per waypoint
    pub approaches: Vec<Option<Approach>>,
    /// Requested output encoding, `None` means default
    pub format: Option<OutputFormat>,
    /// Return turn-by-turn steps
    pub steps: bool,
    /// Search for alternative routes
    pub alternatives: bool,
    /// Overview geometry detail
    pub overview: Overview,
    /// Geometry encoding
    pub geometries: Geometries,
    /// Road classes to avoid
    pub exclude: Vec<String>,
    /// Echo hints back on waypoints
    pub generate_hints: bool,
}

impl Default for RouteParameters {
    fn default() -> Self {
        Self {
            coordinates: Vec::new(),
            hints: Vec::new(),
            bearings: Vec::new(),
            radiuses: Vec::new(),
            approaches: Vec::new(),
            format: None,
            steps: false,
            alternatives: false,
            overview: Overview::default(),
            geometries: Geometries::default(),
            exclude: Vec::new(),
            generate_hints: true,
        }
    }
}

impl RouteParameters {
    /// Create parameters for the given waypoints with every option at its default
    #[must_use]
    pub fn with_coordinates(coordinates: Vec<Coordinate>) -> Self {
        Self {
            coordinates,
            ..Self::default()
        }
    }

    /// Effective output format
    #[must_use]
    pub fn output_format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }

    /// Lengths of the per-coordinate arrays in validation priority order
    #[must_use]
    pub fn per_coordinate_lengths(&self) -> [(&'static str, usize); 4] {
        [
            ("hints", self.hints.len()),
            ("bearings", self.bearings.len()),
            ("radiuses", self.radiuses.len()),
            ("approaches", self.approaches.len()),
        ]
    }

    /// Whether the parameters may be dispatched to an engine
    ///
    /// Every per-coordinate array has length 0 or N, and N is at least two.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let n = self.coordinates.len();
        n >= 2
            && self
                .per_coordinate_lengths()
                .iter()
                .all(|(_, len)| *len == 0 || *len == n)
    }
}
