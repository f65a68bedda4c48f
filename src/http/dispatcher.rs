//! Per-request control loop.
//!
//! # Responsibilities
//! - Resolve the request path against the routing table
//! - Redirect non-canonical paths before any gate is touched
//! - Pass the request through the route's admission gate
//! - Forward admitted requests and release the slot afterwards
//! - Classify failures into `DispatchError`
//!
//! # Design Decisions
//! - The slot is held by a permit guard, released on success, upstream error
//!   and panic alike
//! - On success the guard travels with the response body, so a slot stays
//!   occupied until the body has been sent or dropped
//! - Rejections are routine and logged at debug, upstream faults at warn
//! - No retry and no fallback target

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    http::Request,
    response::{IntoResponse, Response},
};
use hyper::body::{Body as HttpBody, Frame, SizeHint};

use crate::admission::AdmissionPermit;
use crate::http::request::RequestIdExt;
use crate::http::response::{moved_permanently, DispatchError};
use crate::observability::metrics::{self, AdmissionOutcome};
use crate::proxy::Forward;
use crate::routing::{Lookup, Route, RoutingTable};

/// Binds the routing table to a forwarding engine.
pub struct Dispatcher<F> {
    table: RoutingTable,
    forwarder: F,
}

impl<F: Forward> Dispatcher<F> {
    pub fn new(table: RoutingTable, forwarder: F) -> Self {
        Self { table, forwarder }
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// Close every route's gate so queued requests are released.
    pub fn close(&self) {
        self.table.close_all();
    }

    /// Handle a request, answering failures with a synthesized response.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let lookup = self.table.lookup(request.uri().path());
        let label = match &lookup {
            &Lookup::Route(route) => route.pattern(),
            _ => "none",
        };

        let response = self
            .dispatch_lookup(lookup, request)
            .await
            .unwrap_or_else(|err| err.into_response());

        metrics::record_request(label, response.status().as_u16(), start);
        response
    }

    /// Look up, admit and forward a request.
    pub async fn dispatch(&self, request: Request<Body>) -> Result<Response, DispatchError> {
        let lookup = self.table.lookup(request.uri().path());
        self.dispatch_lookup(lookup, request).await
    }

    async fn dispatch_lookup(
        &self,
        lookup: Lookup<'_>,
        request: Request<Body>,
    ) -> Result<Response, DispatchError> {
        match lookup {
            Lookup::Route(route) => self.dispatch_to(route, request).await,
            Lookup::Redirect(path) => Ok(redirect(&request, path)),
            Lookup::NoMatch => Err(no_route(&request)),
        }
    }

    async fn dispatch_to(
        &self,
        route: &Route,
        request: Request<Body>,
    ) -> Result<Response, DispatchError> {
        let request_id = request.request_id().to_owned();
        let gate = route.gate();

        let permit = match gate.enter().await {
            Ok(permit) => permit,
            Err(reason) => {
                metrics::record_admission(route.pattern(), AdmissionOutcome::Rejected);
                tracing::debug!(
                    request_id = %request_id,
                    route = route.pattern(),
                    occupied = gate.occupied(),
                    capacity = gate.capacity(),
                    reason = %reason,
                    "Request rejected"
                );
                return Err(DispatchError::Overloaded {
                    route: route.pattern().to_string(),
                    reason,
                });
            }
        };

        let outcome = if permit.waited() {
            AdmissionOutcome::Queued
        } else {
            AdmissionOutcome::Admitted
        };
        metrics::record_admission(route.pattern(), outcome);
        tracing::debug!(
            request_id = %request_id,
            route = route.pattern(),
            target = %route.target(),
            occupied = gate.occupied(),
            capacity = gate.capacity(),
            waited = permit.waited(),
            "Request admitted"
        );
        let slot = Slot::new(route.pattern(), permit);

        match self.forwarder.forward(route.target(), request).await {
            Ok(response) => Ok(response.map(|body| {
                Body::new(AdmittedBody {
                    inner: body,
                    _slot: slot,
                })
            })),
            Err(source) => {
                drop(slot);
                tracing::warn!(
                    request_id = %request_id,
                    route = route.pattern(),
                    target = %route.target(),
                    error = %source,
                    "Upstream request failed"
                );
                Err(DispatchError::Upstream {
                    route: route.pattern().to_string(),
                    source,
                })
            }
        }
    }
}

/// An admitted request's hold on its route.
struct Slot {
    route: String,
    permit: Option<AdmissionPermit>,
}

impl Slot {
    fn new(route: &str, permit: AdmissionPermit) -> Self {
        metrics::slot_taken(route);
        Self {
            route: route.to_string(),
            permit: Some(permit),
        }
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        if let Some(permit) = self.permit.take() {
            permit.leave();
        }
        metrics::slot_released(&self.route);
    }
}

/// Upstream response body that keeps its slot until sent or dropped.
struct AdmittedBody {
    inner: Body,
    _slot: Slot,
}

impl HttpBody for AdmittedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, axum::Error>>> {
        Pin::new(&mut self.inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

fn redirect(request: &Request<Body>, path: String) -> Response {
    let location = match request.uri().query() {
        Some(query) => format!("{}?{}", path, query),
        None => path,
    };
    tracing::debug!(
        request_id = %request.request_id(),
        path = request.uri().path(),
        location = %location,
        "Redirecting to canonical path"
    );
    moved_permanently(location)
}

fn no_route(request: &Request<Body>) -> DispatchError {
    let path = request.uri().path().to_string();
    tracing::debug!(request_id = %request.request_id(), path = %path, "No route matched");
    DispatchError::NoRoute(path)
}
