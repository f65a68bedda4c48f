//! Path pattern matching.
//!
//! # Responsibilities
//! - Parse configured locations into patterns
//! - Match request paths (case-sensitive)
//! - Report how specific a match is
//! - Canonicalize request paths before lookup
//!
//! # Design Decisions
//! - A pattern ending in `/` matches its whole subtree (`/api/` matches `/api/users`)
//! - Any other pattern matches only that exact path
//! - Specificity is the pattern length, longest match wins
//! - No regex to guarantee O(n) matching

use crate::routing::router::RouteError;

/// A compiled location pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// Matches the path and everything below it.
    Subtree(String),
    /// Matches only this path.
    Exact(String),
}

impl PathPattern {
    /// Compile a location. It must be non-empty and absolute.
    pub fn parse(location: &str) -> Result<Self, RouteError> {
        if location.is_empty() {
            return Err(RouteError::InvalidPattern {
                pattern: location.to_string(),
                reason: "pattern is empty",
            });
        }
        if !location.starts_with('/') {
            return Err(RouteError::InvalidPattern {
                pattern: location.to_string(),
                reason: "pattern must start with '/'",
            });
        }

        if location.ends_with('/') {
            Ok(PathPattern::Subtree(location.to_string()))
        } else {
            Ok(PathPattern::Exact(location.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PathPattern::Subtree(p) | PathPattern::Exact(p) => p,
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Subtree(prefix) => path.starts_with(prefix.as_str()),
            PathPattern::Exact(exact) => path == exact,
        }
    }

    /// Longer patterns are more specific.
    pub fn specificity(&self) -> usize {
        self.as_str().len()
    }
}

/// Canonical form of a request path.
///
/// Empty and `.` segments are dropped, `..` removes the segment before it
/// (never above the root) and a trailing slash is kept.
pub fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }

    let mut cleaned = String::with_capacity(path.len() + 1);
    for segment in &segments {
        cleaned.push('/');
        cleaned.push_str(segment);
    }
    if cleaned.is_empty() || path.ends_with('/') {
        cleaned.push('/');
    }
    cleaned
}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
