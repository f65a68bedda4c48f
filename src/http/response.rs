//! Synthesized responses.
//!
//! # Responsibilities
//! - Map dispatch failures to HTTP status codes
//! - Keep rejection bodies stable for clients
//!
//! # Design Decisions
//! - Non-canonical path → 301 to the canonical one, before any gate
//! - No route → 404, admission rejected → 503
//! - Upstream failure → 502, upstream deadline → 504
//! - The upstream is never contacted for a 404 or 503

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::admission::Rejected;
use crate::proxy::ForwardError;

pub const NOT_FOUND_BODY: &str = "404 page not found";
pub const OVERLOADED_BODY: &str = "server is overloaded";
pub const BAD_GATEWAY_BODY: &str = "upstream request failed";
pub const GATEWAY_TIMEOUT_BODY: &str = "upstream timed out";
pub const MOVED_BODY: &str = "Moved Permanently";

/// 301 pointing the client at `location`.
pub fn moved_permanently(location: String) -> Response {
    (
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, location)],
        MOVED_BODY,
    )
        .into_response()
}

/// Why a request was answered by the proxy instead of the upstream.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no route for path {0:?}")]
    NoRoute(String),

    #[error("route {route:?} rejected request: {reason}")]
    Overloaded { route: String, reason: Rejected },

    #[error("route {route:?}: {source}")]
    Upstream {
        route: String,
        #[source]
        source: ForwardError,
    },
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::NoRoute(_) => StatusCode::NOT_FOUND,
            DispatchError::Overloaded { .. } => StatusCode::SERVICE_UNAVAILABLE,
            DispatchError::Upstream {
                source: ForwardError::Timeout(_),
                ..
            } => StatusCode::GATEWAY_TIMEOUT,
            DispatchError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    fn body(&self) -> &'static str {
        match self {
            DispatchError::NoRoute(_) => NOT_FOUND_BODY,
            DispatchError::Overloaded { .. } => OVERLOADED_BODY,
            DispatchError::Upstream {
                source: ForwardError::Timeout(_),
                ..
            } => GATEWAY_TIMEOUT_BODY,
            DispatchError::Upstream { .. } => BAD_GATEWAY_BODY,
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        (self.status(), self.body()).into_response()
    }
}
