//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → matcher.rs (canonicalize the path)
//!     → router.rs (route lookup)
//!     → matcher.rs (evaluate path patterns)
//!     → Return: matched Route, Redirect or NoMatch
//!
//! Route Compilation (at startup):
//!     PathConfig[]
//!     → Compile patterns
//!     → Size one admission gate per route
//!     → Freeze as immutable RoutingTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - Most specific (longest) pattern wins

pub mod matcher;
pub mod router;

pub use matcher::{clean_path, PathPattern};
pub use router::{Lookup, Route, RouteError, RoutingTable};
