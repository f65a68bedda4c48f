//! Upstream forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Admitted request + route target
//!     → forward.rs (rewrite URI, send via hyper client)
//!     → headers.rs (strip hop-by-hop, X-Forwarded-For)
//!     → upstream response streamed back, or ForwardError
//! ```
//!
//! # Design Decisions
//! - `Forward` trait is the seam between dispatch and the HTTP client
//! - Response bodies are streamed, never buffered

pub mod forward;
pub mod headers;

pub use forward::{Forward, ForwardError, HttpForwarder};
