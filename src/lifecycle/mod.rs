//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Routing table → Metrics → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal (or code) names a reason → Stop accepting → Close admission gates → Drain → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Ordered shutdown: stop accept, release queued waiters, drain

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownListener, ShutdownReason};
pub use startup::StartupError;
