//! Route table and lookup.
//!
//! # Responsibilities
//! - Register routes at startup, each with its own admission gate
//! - Look up the matching route for a request path
//! - Redirect non-canonical paths and bare subtree roots
//! - Return matched route, redirect or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) pattern scan (acceptable for typical route counts)
//! - Longest matching pattern wins, ties go to the earlier registration
//! - Duplicate patterns are an error, never an overwrite
//! - Dot segments and repeated slashes are redirected away before matching,
//!   so a request can never reach a less specific route's gate through them

use tokio::sync::Semaphore;
use url::Url;

use crate::admission::{AdmissionController, OverflowPolicy};
use crate::config::PathConfig;
use crate::routing::matcher::{clean_path, PathPattern};

/// Error raised while building the route table.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern {
        pattern: String,
        reason: &'static str,
    },

    #[error("pattern {0:?} is already registered")]
    DuplicatePattern(String),

    #[error(
        "pattern {pattern:?}: capacity {capacity} must be between 1 and {max}",
        max = Semaphore::MAX_PERMITS
    )]
    InvalidCapacity { pattern: String, capacity: usize },

    #[error("pattern {pattern:?}: invalid target url: {source}")]
    InvalidTarget {
        pattern: String,
        #[source]
        source: url::ParseError,
    },
}

/// A configured path with its upstream and its admission gate.
#[derive(Debug)]
pub struct Route {
    pattern: PathPattern,
    target: Url,
    gate: AdmissionController,
}

impl Route {
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    /// The admission gate owned by this route.
    pub fn gate(&self) -> &AdmissionController {
        &self.gate
    }
}

/// Outcome of looking up a request path.
#[derive(Debug)]
pub enum Lookup<'a> {
    /// The path is canonical and this route serves it.
    Route(&'a Route),
    /// The client should retry at this path.
    Redirect(String),
    /// Nothing serves the path.
    NoMatch,
}

/// Insertion-ordered table of routes.
#[derive(Debug, Default)]
pub struct RoutingTable {
    routes: Vec<Route>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from configured paths, in order.
    pub fn from_config(paths: &[PathConfig]) -> Result<Self, RouteError> {
        let mut table = Self::new();
        for path in paths {
            let target = Url::parse(&path.target).map_err(|source| RouteError::InvalidTarget {
                pattern: path.location.clone(),
                source,
            })?;
            table.register(
                &path.location,
                target,
                path.connection_limit,
                path.drop_over_limit,
            )?;
        }
        Ok(table)
    }

    /// Register a route with a fresh gate of `capacity` slots.
    pub fn register(
        &mut self,
        pattern: &str,
        target: Url,
        capacity: usize,
        drop_over_limit: bool,
    ) -> Result<&Route, RouteError> {
        let pattern = PathPattern::parse(pattern)?;
        if self.routes.iter().any(|r| r.pattern == pattern) {
            return Err(RouteError::DuplicatePattern(pattern.as_str().to_string()));
        }
        if capacity == 0 || capacity > Semaphore::MAX_PERMITS {
            return Err(RouteError::InvalidCapacity {
                pattern: pattern.as_str().to_string(),
                capacity,
            });
        }

        let policy = OverflowPolicy::from_drop_flag(drop_over_limit);
        tracing::info!(
            location = %pattern,
            target = %target,
            capacity,
            policy = %policy,
            "Forwarding location to target"
        );

        self.routes.push(Route {
            pattern,
            target,
            gate: AdmissionController::new(capacity, policy),
        });
        Ok(&self.routes[self.routes.len() - 1])
    }

    /// Look up a raw request path.
    ///
    /// A path that is not in canonical form, or that names a subtree
    /// pattern without its trailing slash, is answered with a redirect
    /// instead of a route.
    pub fn lookup(&self, path: &str) -> Lookup<'_> {
        let cleaned = clean_path(path);
        if let Some(slashed) = self.subtree_redirect(&cleaned) {
            return Lookup::Redirect(slashed);
        }
        if cleaned != path {
            return Lookup::Redirect(cleaned);
        }
        match self.resolve(path) {
            Some(route) => Lookup::Route(route),
            None => Lookup::NoMatch,
        }
    }

    /// `path` with a trailing slash, when only that subtree is registered.
    fn subtree_redirect(&self, path: &str) -> Option<String> {
        if path.ends_with('/') || self.routes.iter().any(|r| r.pattern() == path) {
            return None;
        }
        let slashed = format!("{}/", path);
        self.routes
            .iter()
            .any(|r| r.pattern() == slashed)
            .then_some(slashed)
    }

    /// Find the most specific route for an already canonical `path`.
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        let mut best: Option<&Route> = None;
        for route in &self.routes {
            if !route.pattern.matches(path) {
                continue;
            }
            let better = match best {
                None => true,
                Some(current) => route.pattern.specificity() > current.pattern.specificity(),
            };
            if better {
                best = Some(route);
            }
        }
        best
    }

    /// Routes in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Close every admission gate.
    pub fn close_all(&self) {
        for route in &self.routes {
            route.gate.close();
        }
    }
}
