//! Reverse proxy with per-route admission control.

pub mod admission;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod routing;

pub use admission::{AdmissionController, OverflowPolicy};
pub use config::schema::ProxyConfig;
pub use http::{Dispatcher, HttpServer};
pub use lifecycle::Shutdown;
pub use routing::RoutingTable;
