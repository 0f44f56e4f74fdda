//! # Router
//!
//! Radix-trie based path matching using `matchit`, plus the registry of
//! route services per profile.
//!
//! Request targets look like `/route/v1/{profile}?{query}` or
//! `/route/v1/{profile}/{coordinates}?{query}`. The path picks the endpoint
//! and profile; the query is handed to the profile's [`RouteService`]
//! untouched.

use crate::error::{Error, Result};
use crate::service::RouteService;
use matchit::Router as MatchitRouter;
use std::collections::HashMap;

/// HTTP methods understood by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// HTTP GET
    Get,
    /// HTTP HEAD
    Head,
    /// HTTP POST
    Post,
    /// HTTP PUT
    Put,
    /// HTTP DELETE
    Delete,
    /// HTTP PATCH
    Patch,
    /// HTTP OPTIONS
    Options,
}

impl Method {
    /// Convert from a hyper method; extension methods are not supported
    #[must_use]
    pub fn from_hyper(method: &hyper::Method) -> Option<Self> {
        match *method {
            hyper::Method::GET => Some(Self::Get),
            hyper::Method::HEAD => Some(Self::Head),
            hyper::Method::POST => Some(Self::Post),
            hyper::Method::PUT => Some(Self::Put),
            hyper::Method::DELETE => Some(Self::Delete),
            hyper::Method::PATCH => Some(Self::Patch),
            hyper::Method::OPTIONS => Some(Self::Options),
            _ => None,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Head => write!(f, "HEAD"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
            Self::Patch => write!(f, "PATCH"),
            Self::Options => write!(f, "OPTIONS"),
        }
    }
}

/// What a matched path refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `/route/v1/{profile}`, optionally followed by `/{coordinates}`
    Route,
    /// Liveness probe
    Health,
}

/// Path pattern for route queries
pub const ROUTE_PATH: &str = "/route/v1/{profile}";

/// Path pattern for route queries with the coordinate list in the path
pub const ROUTE_COORDINATES_PATH: &str = "/route/v1/{profile}/{coordinates}";

/// Path pattern for the liveness probe
pub const HEALTH_PATH: &str = "/health";

/// Matched endpoint with extracted path parameters
#[derive(Debug)]
pub struct Match<'a> {
    /// The endpoint this path belongs to
    pub endpoint: Endpoint,
    /// Extracted path parameters
    pub params: HashMap<&'a str, &'a str>,
}

impl<'a> Match<'a> {
    /// The `{profile}` segment, if the endpoint has one
    #[must_use]
    pub fn profile(&self) -> Option<&'a str> {
        self.params.get("profile").copied()
    }

    /// The `{coordinates}` segment, if the path carried one
    #[must_use]
    pub fn coordinates(&self) -> Option<&'a str> {
        self.params.get("coordinates").copied()
    }
}

/// Endpoint matcher and profile registry
#[derive(Clone)]
pub struct Router {
    /// Matchit router for path matching
    paths: MatchitRouter<Endpoint>,
    /// Route service per profile name
    services: HashMap<String, RouteService>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("profiles", &self.profiles())
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Create a router serving the route and health endpoints
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if a built-in pattern is rejected
    pub fn new() -> Result<Self> {
        let mut router = Self {
            paths: MatchitRouter::new(),
            services: HashMap::new(),
        };
        router.add_endpoint(ROUTE_PATH, Endpoint::Route)?;
        router.add_endpoint(ROUTE_COORDINATES_PATH, Endpoint::Route)?;
        router.add_endpoint(HEALTH_PATH, Endpoint::Health)?;
        Ok(router)
    }

    /// Register an additional path pattern
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the pattern is malformed or
    /// conflicts with an existing one
    pub fn add_endpoint(&mut self, pattern: &str, endpoint: Endpoint) -> Result<()> {
        self.paths
            .insert(pattern, endpoint)
            .map_err(|e| Error::InvalidRoutePattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    /// Register the service answering queries for `profile`
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateProfile` if the profile already has a service
    pub fn add_profile(&mut self, profile: impl Into<String>, service: RouteService) -> Result<()> {
        let profile = profile.into();
        if self.services.contains_key(&profile) {
            return Err(Error::DuplicateProfile { profile });
        }
        self.services.insert(profile, service);
        Ok(())
    }

    /// Match a request path against registered endpoints
    ///
    /// # Errors
    ///
    /// Returns `Error::RouteNotFound` if no endpoint matches
    pub fn match_path<'a>(&'a self, path: &'a str) -> Result<Match<'a>> {
        let matched = self.paths.at(path).map_err(|_| Error::RouteNotFound {
            path: path.to_string(),
        })?;

        Ok(Match {
            endpoint: *matched.value,
            params: matched.params.iter().collect(),
        })
    }

    /// Service registered for `profile`
    #[must_use]
    pub fn service(&self, profile: &str) -> Option<&RouteService> {
        self.services.get(profile)
    }

    /// Registered profile names, sorted
    #[must_use]
    pub fn profiles(&self) -> Vec<&str> {
        let mut profiles: Vec<&str> = self.services.keys().map(String::as_str).collect();
        profiles.sort_unstable();
        profiles
    }
}
