//! Prometheus metrics for the table server.
//!
//! Exposed via a scrape endpoint when `METRICS_BIND` is configured.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize the Prometheus metrics exporter.
///
/// Metrics become available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))
}

/// Record an admitted WebSocket connection.
pub fn connection_opened() {
    metrics::gauge!("ws_connections_active").increment(1.0);
    metrics::counter!("ws_connections_total").increment(1);
}

/// Record a closed WebSocket connection.
pub fn connection_closed() {
    metrics::gauge!("ws_connections_active").decrement(1.0);
}

/// Record an inbound command, valid or not.
pub fn command_received() {
    metrics::counter!("ws_commands_total").increment(1);
}

/// Record a rejected command by error kind.
pub fn command_rejected(kind: &str) {
    metrics::counter!("ws_commands_rejected_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record a created table.
pub fn table_created() {
    metrics::counter!("tables_created_total").increment(1);
}

/// Record a settled round.
pub fn round_settled() {
    metrics::counter!("rounds_settled_total").increment(1);
}
