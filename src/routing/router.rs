//! Route table: registration and lookup.
//!
//! # Responsibilities
//! - Store routes in registration order
//! - Reject invalid method sets at registration time
//! - Ignore re-registration of an existing pattern (first one wins)
//! - Find the first route whose pattern matches a path
//! - Resolve route names back to patterns for URL building
//!
//! # Design Decisions
//! - Append-only; there is no removal
//! - First registered match wins, not the most specific one
//! - Routes live behind `Arc` so cloning a table (copy-on-write updates)
//!   never clones handlers
//! - Generic over the handler type; the table never calls handlers

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use axum::http::Method;

use crate::routing::error::RoutingError;
use crate::routing::matcher::{self, PathParams};

/// Methods a route accepts when none are given.
pub const DEFAULT_METHODS: &[&str] = &["GET"];

/// A registered route.
pub struct Route<H> {
    pattern: String,
    handler: H,
    methods: BTreeSet<String>,
    name: Option<String>,
}

impl<H> Route<H> {
    /// Build a route, validating and upper-casing the method set.
    pub fn new<I, S>(
        pattern: impl Into<String>,
        handler: H,
        methods: I,
        name: Option<&str>,
    ) -> Result<Self, RoutingError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pattern = pattern.into();
        let methods = validate_methods(&pattern, methods)?;
        Ok(Self {
            pattern,
            handler,
            methods,
            name: name.map(str::to_string),
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Allowed methods, upper-case, sorted.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(String::as_str)
    }

    /// Whether `method` is in the allowed set. Comparison is exact.
    pub fn allows(&self, method: &str) -> bool {
        self.methods.contains(method)
    }
}

impl<H> fmt::Debug for Route<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern)
            .field("methods", &self.methods)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

fn validate_methods<I, S>(pattern: &str, methods: I) -> Result<BTreeSet<String>, RoutingError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let invalid = |reason: String| RoutingError::InvalidMethodSet {
        pattern: pattern.to_string(),
        reason,
    };

    let mut set = BTreeSet::new();
    for method in methods {
        let method = method.as_ref().trim().to_ascii_uppercase();
        // any RFC 7230 token is a method, extensions like M-SEARCH included
        if Method::from_bytes(method.as_bytes()).is_err() {
            return Err(invalid(format!("`{method}` is not an HTTP method")));
        }
        set.insert(method);
    }
    if set.is_empty() {
        return Err(invalid("no methods given".to_string()));
    }
    Ok(set)
}

/// Ordered collection of routes. Insertion order is match priority.
pub struct RouteTable<H> {
    routes: Vec<Arc<Route<H>>>,
}

impl<H> RouteTable<H> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Register a route.
    ///
    /// Returns `Ok(false)` without changing anything when `pattern` is
    /// already registered.
    pub fn add<I, S>(
        &mut self,
        pattern: impl Into<String>,
        handler: H,
        methods: I,
        name: Option<&str>,
    ) -> Result<bool, RoutingError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let route = Route::new(pattern, handler, methods, name)?;
        self.insert(route)
    }

    /// Register an already built route. Same rules as [`RouteTable::add`].
    pub fn insert(&mut self, route: Route<H>) -> Result<bool, RoutingError> {
        if self.contains_pattern(route.pattern()) {
            tracing::debug!(pattern = %route.pattern(), "Route already registered, ignoring");
            return Ok(false);
        }
        if let Some(name) = route.name() {
            if self.find_by_name(name).is_some() {
                return Err(RoutingError::DuplicateRouteName(name.to_string()));
            }
        }
        tracing::debug!(
            pattern = %route.pattern(),
            name = ?route.name(),
            "Route registered"
        );
        self.routes.push(Arc::new(route));
        Ok(true)
    }

    pub fn contains_pattern(&self, pattern: &str) -> bool {
        self.routes.iter().any(|r| r.pattern == pattern)
    }

    /// Pattern of the first route registered under `name`.
    pub fn find_by_name(&self, name: &str) -> Option<&str> {
        self.routes
            .iter()
            .find(|r| r.name.as_deref() == Some(name))
            .map(|r| r.pattern.as_str())
    }

    /// Build a URL for the route named `name`.
    pub fn url_for(&self, name: &str, params: &PathParams) -> Result<String, RoutingError> {
        let pattern = self
            .find_by_name(name)
            .ok_or_else(|| RoutingError::UnknownRouteName(name.to_string()))?;
        matcher::encode(pattern, params)
    }

    /// First route (in registration order) whose pattern matches `path`.
    pub fn match_path(&self, path: &str) -> Option<(&Arc<Route<H>>, PathParams)> {
        self.routes.iter().find_map(|route| {
            matcher::match_route(&route.pattern, path)
                .into_params()
                .map(|params| (route, params))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Route<H>>> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<H> Clone for RouteTable<H> {
    fn clone(&self) -> Self {
        Self {
            routes: self.routes.clone(),
        }
    }
}

impl<H> Default for RouteTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> fmt::Debug for RouteTable<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.routes.iter()).finish()
    }
}
