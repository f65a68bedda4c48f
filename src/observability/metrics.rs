//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy metrics (requests, latency, admission decisions, occupancy)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `proxy_requests_total` (counter): total requests by route, status
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `proxy_admission_total` (counter): admission decisions by route, outcome
//! - `proxy_route_occupied` (gauge): admitted, not yet released requests per route
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels for route and status code only

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Result of passing an admission gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionOutcome {
    /// A slot was free.
    Admitted,
    /// Admitted after waiting for a slot.
    Queued,
    /// Turned away.
    Rejected,
}

impl AdmissionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionOutcome::Admitted => "admitted",
            AdmissionOutcome::Queued => "queued",
            AdmissionOutcome::Rejected => "rejected",
        }
    }
}

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(route: &str, status: u16, start: Instant) {
    let labels = [
        ("route", route.to_string()),
        ("status", status.to_string()),
    ];
    counter!("proxy_requests_total", &labels).increment(1);
    histogram!("proxy_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_admission(route: &str, outcome: AdmissionOutcome) {
    counter!(
        "proxy_admission_total",
        "route" => route.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

pub fn slot_taken(route: &str) {
    gauge!("proxy_route_occupied", "route" => route.to_string()).increment(1.0);
}

pub fn slot_released(route: &str) {
    gauge!("proxy_route_occupied", "route" => route.to_string()).decrement(1.0);
}
