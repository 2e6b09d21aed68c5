//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_connections_accepted_total` (counter): accepted client connections
//! - `relay_active_connections` (gauge): connections currently being served
//! - `relay_exchanges_total` (counter): finished exchanges by `outcome`
//! - `relay_response_bytes_total` (counter): bytes relayed back to clients
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - The Prometheus exporter is opt-in

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter, serving scrapes on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connection_accepted(active: u64) {
    metrics::counter!("relay_connections_accepted_total").increment(1);
    record_active_connections(active);
}

pub fn record_active_connections(active: u64) {
    metrics::gauge!("relay_active_connections").set(active as f64);
}

pub fn record_exchange(outcome: &'static str, response_bytes: u64) {
    metrics::counter!("relay_exchanges_total", "outcome" => outcome).increment(1);
    if response_bytes > 0 {
        metrics::counter!("relay_response_bytes_total").increment(response_bytes);
    }
}
