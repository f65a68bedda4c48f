//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → dispatcher.rs (route → admit → forward → release)
//!     → response.rs (404 / 503 / 502 / 504 when the proxy answers itself)
//!     → Send to client
//! ```

pub mod dispatcher;
pub mod request;
pub mod response;
pub mod server;

pub use dispatcher::Dispatcher;
pub use request::{MakeRequestUuid, RequestIdExt, X_REQUEST_ID};
pub use response::DispatchError;
pub use server::HttpServer;
