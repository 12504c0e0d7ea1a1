use prometheus::{Encoder, Histogram, IntCounter, IntCounterVec, TextEncoder};

/// Metrics registration
lazy_static::lazy_static! {
    pub static ref LOADS_TOTAL: IntCounter = prometheus::register_int_counter!(
        "optionloader_loads_total",
        "Total number of load attempts"
    ).unwrap();

    pub static ref LOAD_FAILURES: IntCounter = prometheus::register_int_counter!(
        "optionloader_load_failures_total",
        "Total number of loads aborted by a fetch or decode failure"
    ).unwrap();

    pub static ref TRANSLATOR_ERRORS: IntCounterVec = prometheus::register_int_counter_vec!(
        "optionloader_translator_errors_total",
        "Total number of translator failures per registry",
        &["registry"]
    ).unwrap();

    pub static ref FETCH_LATENCY: Histogram = prometheus::register_histogram!(
        "optionloader_fetch_latency_seconds",
        "Key-value store fetch latency in seconds",
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    ).unwrap();
}

/// Renders every registered metric in the Prometheus text format.
pub fn gather_text() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(%err, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Metrics handler for Prometheus
pub async fn metrics_handler() -> String {
    gather_text()
}
