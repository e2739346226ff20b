//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_connection_handlers_active` (gauge): live connection handlers
//! - `proxy_connection_handlers_busy` (gauge): handlers with an exchange in flight
//! - `proxy_synthesized_responses_total` (counter): proxy-generated status lines by status, direction
//! - `proxy_target_connect_failures_total` (counter): failed target connects
//! - `proxy_exchange_duration_seconds` (histogram): request start to response end
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::http::{MessageKind, StatusCode};

/// Install the Prometheus recorder and serve it on `address`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(address: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(address).install()?;
    tracing::info!(%address, "Prometheus metrics endpoint listening");
    Ok(())
}

pub fn set_active_handlers(count: usize) {
    metrics::gauge!("proxy_connection_handlers_active").set(count as f64);
}

pub fn set_busy_handlers(count: usize) {
    metrics::gauge!("proxy_connection_handlers_busy").set(count as f64);
}

pub fn record_synthesized_status(status: StatusCode, kind: MessageKind) {
    metrics::counter!(
        "proxy_synthesized_responses_total",
        "status" => status.code().to_string(),
        "direction" => kind.as_str()
    )
    .increment(1);
}

pub fn record_target_connect_failure() {
    metrics::counter!("proxy_target_connect_failures_total").increment(1);
}

pub fn record_exchange(duration: Duration) {
    metrics::histogram!("proxy_exchange_duration_seconds").record(duration.as_secs_f64());
}
