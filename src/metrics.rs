//! Prometheus metrics for the scan loop and exchange calls.
//!
//! This module provides metrics for:
//! - Scan cycles and scan errors
//! - Completed trades and aborts by reason
//! - Failed trade legs by direction
//! - Exchange request latency by endpoint

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{debug, info};

use crate::error::BotError;
use crate::market::Endpoint;
use crate::trading::TradeAction;

// === Metric Name Constants ===

/// Exchange request latency metric name.
pub const METRIC_EXCHANGE_REQUEST_LATENCY: &str = "exchange_request_latency_ms";
/// Scan cycles counter metric name.
pub const METRIC_CYCLES: &str = "cycles_total";
/// Completed trades counter metric name.
pub const METRIC_TRADES_COMPLETED: &str = "trades_completed_total";
/// Trade aborts counter metric name.
pub const METRIC_TRADE_ABORTS: &str = "trade_aborts_total";
/// Failed trade legs counter metric name.
pub const METRIC_TRADE_LEGS_FAILED: &str = "trade_legs_failed_total";
/// Scan errors counter metric name.
pub const METRIC_SCAN_ERRORS: &str = "scan_errors_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_EXCHANGE_REQUEST_LATENCY,
        "Exchange request latency in milliseconds"
    );

    describe_counter!(METRIC_CYCLES, "Total number of scan cycles run");
    describe_counter!(
        METRIC_TRADES_COMPLETED,
        "Total number of sell and buy pairs completed"
    );
    describe_counter!(
        METRIC_TRADE_ABORTS,
        "Total number of opportunities abandoned, by reason"
    );
    describe_counter!(
        METRIC_TRADE_LEGS_FAILED,
        "Total number of trade legs that failed, by action"
    );
    describe_counter!(
        METRIC_SCAN_ERRORS,
        "Total number of cycles that ended in an error or panic"
    );

    debug!("Metrics initialized");
}

/// Serve metrics on `0.0.0.0:<port>/metrics`.
pub fn install_exporter(port: u16) -> Result<(), BotError> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| BotError::Metrics(e.to_string()))?;

    info!(%addr, "Prometheus exporter listening");
    Ok(())
}

/// Record exchange request latency.
pub fn record_exchange_latency(start: Instant, endpoint: Endpoint) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_EXCHANGE_REQUEST_LATENCY, "endpoint" => endpoint.to_string())
        .record(latency_ms);
}

/// Increment cycles counter.
pub fn inc_cycles() {
    counter!(METRIC_CYCLES).increment(1);
}

/// Increment completed trades counter.
pub fn inc_trades_completed() {
    counter!(METRIC_TRADES_COMPLETED).increment(1);
}

/// Increment trade aborts counter.
pub fn inc_trade_aborts(reason: &'static str) {
    counter!(METRIC_TRADE_ABORTS, "reason" => reason).increment(1);
}

/// Increment failed trade legs counter.
pub fn inc_trade_legs_failed(action: TradeAction) {
    counter!(METRIC_TRADE_LEGS_FAILED, "action" => action.to_string()).increment(1);
}

/// Increment scan errors counter.
pub fn inc_scan_errors() {
    counter!(METRIC_SCAN_ERRORS).increment(1);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    endpoint: Endpoint,
}

impl LatencyTimer {
    /// Create a new latency timer for the given endpoint.
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            start: Instant::now(),
            endpoint,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_exchange_latency(self.start, self.endpoint);
    }
}
