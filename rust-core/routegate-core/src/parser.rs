//! # Query Parser
//!
//! Turns a raw route query (`coordinates=1,1;2,2&steps=true`) into
//! [`RouteParameters`].
//!
//! Parsing is pure deserialization: it checks that every value is
//! well-formed but never compares arrays against each other. That is the
//! validator's job.
//!
//! Two layouts are accepted:
//!
//! - `coordinates=1,1;2,2&steps=true`, everything as key/value pairs
//! - `1,1;2,2?steps=true`, the coordinate list first, as it appears in the
//!   path of `/route/v1/{profile}/{coordinates}` requests
//!
//! The parser reports how far it got. A caller that sees an end offset short
//! of the query length treats the remainder as unconsumed input.

use crate::params::{
    Approach, Bearing, Coordinate, Geometries, OutputFormat, Overview, Radius, RouteParameters,
};
use std::collections::HashSet;
use thiserror::Error;
use tracing::trace;

const COORDINATES_KEY: &str = "coordinates=";

/// Grammar boundary used by the route service
///
/// Implementations return the decoded parameters, if any, together with the
/// byte offset at which parsing stopped. A full parse returns
/// `query.len()`.
pub trait QueryParser: Send + Sync {
    /// Parse `query`, returning the parameters and the end offset
    fn parse(&self, query: &str) -> (Option<RouteParameters>, usize);
}

/// Reason a single `key=value` pair was rejected
#[derive(Debug, Error, PartialEq, Eq)]
enum PairError {
    #[error("unknown parameter {0:?}")]
    UnknownKey(String),
    #[error("parameter {0:?} given more than once")]
    DuplicateKey(String),
    #[error("malformed value for {0:?}")]
    MalformedValue(String),
}

/// Default route query grammar
///
/// The coordinate list must come first, either as a leading `coordinates=`
/// pair or bare in front of a `?`. Each following pair is parsed as a unit;
/// the first bad pair stops the parse at the separator in front of it.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrammarParser;

impl GrammarParser {
    /// Create a new parser
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl QueryParser for GrammarParser {
    fn parse(&self, query: &str) -> (Option<RouteParameters>, usize) {
        let (start, separator, rest) = query
            .strip_prefix(COORDINATES_KEY)
            .map_or((0, '?', query), |rest| (COORDINATES_KEY.len(), '&', rest));
        let (list, options) = match rest.split_once(separator) {
            Some((list, options)) => (list, Some(options)),
            None => (rest, None),
        };

        let Some(coordinates) = parse_coordinates(list) else {
            trace!(coordinates = %list, "query does not start with coordinates");
            return (None, 0);
        };

        let mut params = RouteParameters::with_coordinates(coordinates);
        let list_end = start + list.len();
        let Some(options) = options else {
            return (Some(params), list_end);
        };

        // offsets of `options` are relative to the byte after the separator
        let base = list_end + 1;
        let mut seen = HashSet::from(["coordinates"]);
        for (offset, pair) in split_pairs(options) {
            if let Err(err) = apply_pair(&mut params, pair, &mut seen) {
                let stop = base + offset - 1;
                trace!(offset = stop, error = %err, "query parse stopped");
                return (Some(params), stop);
            }
        }

        (Some(params), query.len())
    }
}

/// Split a query on `&`, yielding each pair with its starting byte offset
fn split_pairs(query: &str) -> impl Iterator<Item = (usize, &str)> {
    query.split('&').scan(0, |offset, pair| {
        let start = *offset;
        *offset += pair.len() + 1;
        Some((start, pair))
    })
}

fn apply_pair(
    params: &mut RouteParameters,
    pair: &str,
    seen: &mut HashSet<&'static str>,
) -> Result<(), PairError> {
    let (key, value) = pair
        .split_once('=')
        .ok_or_else(|| PairError::MalformedValue(pair.to_string()))?;

    let key: &'static str = match key {
        "coordinates" => "coordinates",
        "hints" => "hints",
        "bearings" => "bearings",
        "radiuses" => "radiuses",
        "approaches" => "approaches",
        "format" => "format",
        "steps" => "steps",
        "alternatives" => "alternatives",
        "overview" => "overview",
        "geometries" => "geometries",
        "exclude" => "exclude",
        "generate_hints" => "generate_hints",
        other => return Err(PairError::UnknownKey(other.to_string())),
    };
    if !seen.insert(key) {
        return Err(PairError::DuplicateKey(key.to_string()));
    }

    let malformed = || PairError::MalformedValue(key.to_string());
    match key {
        "hints" => params.hints = parse_list(value, parse_hint).ok_or_else(malformed)?,
        "bearings" => params.bearings = parse_list(value, parse_bearing).ok_or_else(malformed)?,
        "radiuses" => params.radiuses = parse_list(value, parse_radius).ok_or_else(malformed)?,
        "approaches" => {
            params.approaches = parse_list(value, Approach::from_keyword).ok_or_else(malformed)?;
        }
        "format" => {
            params.format = Some(OutputFormat::from_specifier(value).ok_or_else(malformed)?);
        }
        "steps" => params.steps = parse_bool(value).ok_or_else(malformed)?,
        "alternatives" => params.alternatives = parse_bool(value).ok_or_else(malformed)?,
        "generate_hints" => params.generate_hints = parse_bool(value).ok_or_else(malformed)?,
        "overview" => {
            params.overview = match value {
                "simplified" => Overview::Simplified,
                "full" => Overview::Full,
                "false" => Overview::False,
                _ => return Err(malformed()),
            };
        }
        "geometries" => {
            params.geometries = match value {
                "polyline" => Geometries::Polyline,
                "polyline6" => Geometries::Polyline6,
                "geojson" => Geometries::GeoJson,
                _ => return Err(malformed()),
            };
        }
        "exclude" => params.exclude = parse_exclude(value).ok_or_else(malformed)?,
        // coordinates only appear here as a repeat, which `seen` already rejected
        _ => return Err(malformed()),
    }
    Ok(())
}

/// Parse a `;`-separated list where every entry may be left empty
fn parse_list<T>(value: &str, item: impl Fn(&str) -> Option<T>) -> Option<Vec<Option<T>>> {
    value
        .split(';')
        .map(|entry| {
            if entry.is_empty() {
                Some(None)
            } else {
                item(entry).map(Some)
            }
        })
        .collect()
}

fn parse_coordinates(value: &str) -> Option<Vec<Coordinate>> {
    value
        .split(';')
        .map(|entry| {
            let (lon, lat) = entry.split_once(',')?;
            let coordinate = Coordinate::new(parse_finite(lon)?, parse_finite(lat)?);
            coordinate.is_valid().then_some(coordinate)
        })
        .collect()
}

fn parse_finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_hint(s: &str) -> Option<String> {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '='))
        .then(|| s.to_string())
}

fn parse_bearing(s: &str) -> Option<Bearing> {
    let (bearing, range) = s.split_once(',')?;
    let bearing = bearing.parse::<u16>().ok().filter(|b| *b <= 360)?;
    let range = range.parse::<u16>().ok().filter(|r| *r <= 180)?;
    Some(Bearing { bearing, range })
}

fn parse_radius(s: &str) -> Option<Radius> {
    if s == "unlimited" {
        return Some(Radius::Unlimited);
    }
    parse_finite(s).filter(|r| *r >= 0.0).map(Radius::Meters)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn parse_exclude(value: &str) -> Option<Vec<String>> {
    value
        .split(',')
        .map(|class| {
            (!class.is_empty() && class.chars().all(|c| c.is_ascii_lowercase() || c == '_'))
                .then(|| class.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(query: &str) -> (Option<RouteParameters>, usize) {
        GrammarParser::new().parse(query)
    }

    #[test]
    fn test_parse_coordinates_only() {
        let (params, end) = parse("coordinates=1,1;2,2");
        let params = params.unwrap();
        assert_eq!(end, 19);
        assert_eq!(
            params.coordinates,
            vec![Coordinate::new(1.0, 1.0), Coordinate::new(2.0, 2.0)]
        );
        assert!(params.hints.is_empty());
        assert_eq!(params.format, None);
    }

    #[test]
    fn test_parse_full_query() {
        let query = "coordinates=9.974192,49.782036;9.936275,49.792492\
                     &hints=abc;&bearings=90,10;&radiuses=unlimited;25.5\
                     &approaches=curb;unrestricted&format=flatbuffers\
                     &steps=true&alternatives=false&overview=false\
                     &geometries=geojson&exclude=ferry,toll&generate_hints=false";
        let (params, end) = parse(query);
        let params = params.unwrap();
        assert_eq!(end, query.len());
        assert_eq!(params.hints, vec![Some("abc".to_string()), None]);
        assert_eq!(
            params.bearings,
            vec![Some(Bearing { bearing: 90, range: 10 }), None]
        );
        assert_eq!(
            params.radiuses,
            vec![Some(Radius::Unlimited), Some(Radius::Meters(25.5))]
        );
        assert_eq!(
            params.approaches,
            vec![Some(Approach::Curb), Some(Approach::Unrestricted)]
        );
        assert_eq!(params.format, Some(OutputFormat::Flatbuffers));
        assert!(params.steps);
        assert!(!params.alternatives);
        assert_eq!(params.overview, Overview::False);
        assert_eq!(params.geometries, Geometries::GeoJson);
        assert_eq!(params.exclude, vec!["ferry".to_string(), "toll".to_string()]);
        assert!(!params.generate_hints);
    }

    #[test]
    fn test_unknown_key_stops_at_ampersand() {
        let (params, end) = parse("coordinates=1,1;2,2&bogus=x");
        assert!(params.is_some());
        assert_eq!(end, 19);
    }

    #[test]
    fn test_bad_value_after_good_pairs() {
        let query = "coordinates=1,1;2,2&steps=true&bearings=400,10;";
        let (params, end) = parse(query);
        assert!(params.unwrap().steps);
        assert_eq!(end, 30);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let (_, end) = parse("coordinates=1,1;2,2&steps=true&steps=false");
        assert_eq!(end, 30);
    }

    #[test]
    fn test_trailing_ampersand_is_unconsumed() {
        let query = "coordinates=1,1;2,2&";
        let (params, end) = parse(query);
        assert!(params.is_some());
        assert_eq!(end, 19);
        assert!(end < query.len());
    }

    #[test]
    fn test_missing_coordinates() {
        assert_eq!(parse("").0, None);
        assert_eq!(parse("hints=abc").1, 0);
        assert_eq!(parse("coordinates=1,x;2,2").0, None);
        assert_eq!(parse("coordinates=").0, None);
        assert_eq!(parse("coordinates=200,1;2,2").0, None);
        assert_eq!(parse("coordinates=NaN,1;2,2").0, None);
    }

    #[test]
    fn test_mismatched_lengths_still_parse() {
        let (params, end) = parse("coordinates=1,1;2,2&hints=abc");
        assert_eq!(end, 29);
        assert_eq!(params.unwrap().hints.len(), 1);
    }

    #[test]
    fn test_single_coordinate_parses() {
        let (params, end) = parse("coordinates=1,1");
        assert_eq!(end, 15);
        assert_eq!(params.unwrap().coordinates.len(), 1);
    }

    #[test]
    fn test_path_layout() {
        let query = "9.974192,49.782036;9.936275,49.792492?steps=false&alternatives=false&overview=false&exclude=ferry";
        let (params, end) = parse(query);
        let params = params.unwrap();
        assert_eq!(end, query.len());
        assert_eq!(params.coordinates.len(), 2);
        assert_eq!(params.overview, Overview::False);
        assert_eq!(params.exclude, vec!["ferry".to_string()]);
    }

    #[test]
    fn test_path_layout_without_options() {
        let (params, end) = parse("1,1;2,2");
        assert_eq!(end, 7);
        assert_eq!(params.unwrap().coordinates.len(), 2);
    }

    #[test]
    fn test_path_layout_stop_positions() {
        // first option fails: stop at '?'
        let (params, end) = parse("1,1;2,2?bogus=x");
        assert!(params.is_some());
        assert_eq!(end, 7);

        // later option fails: stop at the '&' in front of it
        let (_, end) = parse("1,1;2,2?steps=true&steps=false");
        assert_eq!(end, 18);

        let (_, end) = parse("1,1;2,2?coordinates=3,3");
        assert_eq!(end, 7);
    }

    #[test]
    fn test_path_layout_bad_coordinates() {
        assert_eq!(parse("1,1;2,x?steps=true"), (None, 0));
        assert_eq!(parse("1,1;2,2&steps=true").0, None);
    }

    #[test]
    fn test_split_pairs_offsets() {
        let pairs: Vec<_> = split_pairs("a=1&bb=2&").collect();
        assert_eq!(pairs, vec![(0, "a=1"), (4, "bb=2"), (9, "")]);
    }

    #[test]
    fn test_value_helpers() {
        assert_eq!(parse_radius("-1"), None);
        assert_eq!(parse_radius("0"), Some(Radius::Meters(0.0)));
        assert_eq!(parse_hint("a+b"), None);
        assert_eq!(parse_exclude("motorway,"), None);
        assert_eq!(parse_bool("1"), None);
    }
}
