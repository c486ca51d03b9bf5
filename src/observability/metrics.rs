//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lb_requests_total` (counter): proxied requests by method, status, backend
//! - `lb_request_duration_seconds` (histogram): proxy latency
//! - `lb_backend_alive` (gauge): 1=alive, 0=dead
//! - `limiter_decisions_total` (counter): allow/deny by transport
//! - `broker_messages_total` (counter): pushes and pops
//! - `broker_queue_depth` (gauge): messages waiting
//! - `worker_notifications_total` (counter): sent/failed/malformed
//! - `net_connections_total` (counter): accepted line-protocol connections by service
//! - `net_active_connections` (gauge): open line-protocol connections by service
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, backend: &str, start: Instant) {
    let status = status.to_string();
    counter!(
        "lb_requests_total",
        "method" => method.to_string(),
        "status" => status,
        "backend" => backend.to_string()
    )
    .increment(1);
    histogram!("lb_request_duration_seconds", "backend" => backend.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_backend_health(backend: &str, alive: bool) {
    gauge!("lb_backend_alive", "backend" => backend.to_string()).set(if alive { 1.0 } else { 0.0 });
}

pub fn record_limiter_decision(transport: &'static str, allowed: bool) {
    let decision = if allowed { "allow" } else { "deny" };
    counter!("limiter_decisions_total", "transport" => transport, "decision" => decision).increment(1);
}

pub fn record_broker_op(op: &'static str) {
    counter!("broker_messages_total", "op" => op).increment(1);
}

pub fn record_queue_depth(depth: usize) {
    gauge!("broker_queue_depth").set(depth as f64);
}

pub fn record_notification(outcome: &'static str) {
    counter!("worker_notifications_total", "outcome" => outcome).increment(1);
}

pub fn record_connection_opened(service: &'static str, active: usize) {
    counter!("net_connections_total", "service" => service).increment(1);
    gauge!("net_active_connections", "service" => service).set(active as f64);
}

pub fn record_connection_closed(service: &'static str, active: usize) {
    gauge!("net_active_connections", "service" => service).set(active as f64);
}
