//! Admission control subsystem.
//!
//! # Data Flow
//! ```text
//! Route resolved
//!     → controller.rs (enter the route's gate)
//!         - slot free          → Admitted (permit held for the request)
//!         - full, Drop policy  → Rejected (503, upstream untouched)
//!         - full, Queue policy → Waiting → Admitted once a slot frees
//!     → forward request
//!     → permit dropped (slot released on every exit path)
//! ```
//!
//! # Design Decisions
//! - One gate per route, never shared between routes
//! - Counting semaphore, the permit is the only way to hold a slot
//! - Release is tied to `Drop`, so panics and early returns cannot leak capacity
//! - No timeout on queued waits

pub mod controller;

pub use controller::{AdmissionController, AdmissionPermit, OverflowPolicy, Rejected};
