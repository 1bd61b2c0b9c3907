//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_redirects_total` (counter): redirect rules that produced a 301
//! - `edge_rewrites_total` (counter): rewrite rules that changed the origin path
//! - `edge_header_rules_applied_total` (counter): header rules set on responses
//! - `edge_handler_faults_total` (counter): requests that failed closed, by stage
//! - `edge_origin_requests_total` (counter): origin fetches by status

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with an HTTP listener on `addr`.
///
/// Must be called from inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_redirect() {
    metrics::counter!("edge_redirects_total").increment(1);
}

pub fn record_rewrite() {
    metrics::counter!("edge_rewrites_total").increment(1);
}

pub fn record_headers_applied(count: usize) {
    if count > 0 {
        metrics::counter!("edge_header_rules_applied_total").increment(count as u64);
    }
}

/// Where a request failed closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultStage {
    /// The request hook passed the request through unmodified.
    Request,
    /// The emulator could not build the request to the origin.
    Origin,
}

impl FaultStage {
    pub fn as_str(self) -> &'static str {
        match self {
            FaultStage::Request => "request",
            FaultStage::Origin => "origin",
        }
    }
}

/// Record a request that failed closed.
pub fn record_fault(stage: FaultStage) {
    metrics::counter!("edge_handler_faults_total", "stage" => stage.as_str()).increment(1);
}

pub fn record_origin_response(status: u16) {
    metrics::counter!("edge_origin_requests_total", "status" => status.to_string()).increment(1);
}
