//! # Routing Engine
//!
//! The capability the route service dispatches to.
//!
//! An engine receives parameters that already passed validation and a
//! container whose variant matches the requested format. It fills the
//! container in place and reports a [`Status`]. Engines are shared across
//! concurrent requests, so `route` takes `&self`.
//!
//! [`GreatCircleEngine`] is a small reference engine that joins waypoints
//! with great-circle legs at a constant speed. It needs no graph data, which
//! makes it useful for running the gateway stand-alone.

use crate::params::{Coordinate, RouteParameters};
use crate::result::RouteResult;
use bytes::BufMut;
use serde_json::{json, Value};
use std::fmt;

/// Terminal outcome of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The request succeeded
    Ok,
    /// Validation or the engine rejected the request
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "Ok"),
            Self::Error => write!(f, "Error"),
        }
    }
}

/// Route computation capability
pub trait RoutingEngine: Send + Sync {
    /// Compute a route for validated `params`, writing into `result`
    fn route(&self, params: &RouteParameters, result: &mut RouteResult) -> Status;

    /// Engine name for logging
    fn name(&self) -> &'static str {
        "Unknown"
    }
}

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates in meters (haversine)
#[must_use]
pub fn haversine_meters(from: Coordinate, to: Coordinate) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lon = (to.lon - from.lon).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + (d_lon / 2.0).sin().powi(2) * from.lat.to_radians().cos() * to.lat.to_radians().cos();
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c * 1_000.0
}

/// One leg between consecutive waypoints
#[derive(Debug, Clone, Copy, PartialEq)]
struct Leg {
    distance: f64,
    duration: f64,
}

/// Reference engine: straight great-circle legs at a constant speed
#[derive(Debug, Clone)]
pub struct GreatCircleEngine {
    speed_mps: f64,
    classes: Vec<String>,
}

impl Default for GreatCircleEngine {
    fn default() -> Self {
        Self::new(13.9)
    }
}

impl GreatCircleEngine {
    /// Create an engine travelling at `speed_mps` meters per second
    #[must_use]
    pub fn new(speed_mps: f64) -> Self {
        Self {
            speed_mps,
            classes: vec!["motorway".to_string(), "toll".to_string(), "ferry".to_string()],
        }
    }

    /// Replace the road classes that `exclude` may name
    #[must_use]
    pub fn with_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classes = classes.into_iter().map(Into::into).collect();
        self
    }

    /// Configured travel speed
    #[must_use]
    pub const fn speed_mps(&self) -> f64 {
        self.speed_mps
    }

    fn legs(&self, coordinates: &[Coordinate]) -> Vec<Leg> {
        coordinates
            .windows(2)
            .map(|pair| {
                let distance = haversine_meters(pair[0], pair[1]);
                Leg {
                    distance,
                    duration: distance / self.speed_mps,
                }
            })
            .collect()
    }

    /// Check `exclude` against the known classes
    ///
    /// Returns the error code and message to report, if any.
    fn check_exclude(&self, exclude: &[String]) -> Option<(&'static str, &'static str)> {
        if exclude.iter().any(|class| !self.classes.contains(class)) {
            return Some(("InvalidValue", "Exclude flag combination is not supported."));
        }
        if !self.classes.is_empty() && self.classes.iter().all(|class| exclude.contains(class)) {
            return Some(("NoRoute", "Impossible route between points"));
        }
        None
    }

    fn write_document(params: &RouteParameters, legs: &[Leg], doc: &mut RouteResult) {
        let leg_values: Vec<Value> = legs
            .iter()
            .zip(params.coordinates.windows(2))
            .map(|(leg, pair)| {
                let steps = if params.steps {
                    vec![
                        step("depart", pair[0], leg.distance, leg.duration),
                        step("arrive", pair[1], 0.0, 0.0),
                    ]
                } else {
                    Vec::new()
                };
                json!({
                    "distance": leg.distance,
                    "duration": leg.duration,
                    "weight": leg.duration,
                    "summary": "",
                    "steps": steps,
                })
            })
            .collect();

        let distance: f64 = legs.iter().map(|leg| leg.distance).sum();
        let duration: f64 = legs.iter().map(|leg| leg.duration).sum();

        let waypoints: Vec<Value> = params
            .coordinates
            .iter()
            .enumerate()
            .map(|(i, coordinate)| {
                let mut waypoint = json!({
                    "location": [coordinate.lon, coordinate.lat],
                    "name": "",
                    "distance": 0.0,
                });
                let hint = params.hints.get(i).and_then(Option::as_deref);
                if let (true, Some(hint), Some(obj)) =
                    (params.generate_hints, hint, waypoint.as_object_mut())
                {
                    obj.insert("hint".to_string(), Value::from(hint));
                }
                waypoint
            })
            .collect();

        doc.insert("code", "Ok");
        doc.insert(
            "routes",
            json!([{
                "distance": distance,
                "duration": duration,
                "weight": duration,
                "weight_name": "duration",
                "legs": leg_values,
            }]),
        );
        doc.insert("waypoints", waypoints);
    }

    fn write_buffer(legs: &[Leg], buf: &mut bytes::BytesMut) {
        let count = u32::try_from(legs.len()).unwrap_or(u32::MAX);
        buf.reserve(4 + legs.len() * 16);
        buf.put_u32_le(count);
        for leg in legs {
            buf.put_f64_le(leg.distance);
            buf.put_f64_le(leg.duration);
        }
    }
}

fn step(kind: &str, location: Coordinate, distance: f64, duration: f64) -> Value {
    json!({
        "distance": distance,
        "duration": duration,
        "maneuver": {
            "type": kind,
            "location": [location.lon, location.lat],
        },
    })
}

impl RoutingEngine for GreatCircleEngine {
    fn route(&self, params: &RouteParameters, result: &mut RouteResult) -> Status {
        if let Some((code, message)) = self.check_exclude(&params.exclude) {
            // a buffer has no room for code and message, so errors always go out as documents
            *result = RouteResult::error(code, message);
            return Status::Error;
        }

        let legs = self.legs(&params.coordinates);
        match result {
            RouteResult::Buffer(buf) => Self::write_buffer(&legs, buf),
            RouteResult::Document(_) => Self::write_document(params, &legs, result),
        }
        Status::Ok
    }

    fn name(&self) -> &'static str {
        "GreatCircleEngine"
    }
}
