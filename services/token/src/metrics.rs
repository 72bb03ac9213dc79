//! Prometheus metrics for the token rotation service.
//!
//! Registered lazily in the default registry and rendered by
//! [`render`] for the `/metrics` endpoint.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

/// Tokens signed, by kind.
pub static TOKENS_ISSUED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_rotation_tokens_issued_total",
        "Total number of tokens issued",
        &["token_type"]
    )
    .expect("Failed to register tokens_issued metric")
});

/// Outcome of issuance requests.
pub static ISSUANCE_OUTCOMES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_rotation_issuance_total",
        "Issuance requests by outcome",
        &["outcome"]
    )
    .expect("Failed to register issuance metric")
});

/// Outcome of refresh requests: `success` or an error code.
pub static REFRESH_OUTCOMES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_rotation_refresh_total",
        "Refresh requests by outcome",
        &["outcome"]
    )
    .expect("Failed to register refresh metric")
});

/// Security events counter.
pub static SECURITY_EVENTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_rotation_security_events_total",
        "Total number of security events",
        &["event_type"]
    )
    .expect("Failed to register security_events metric")
});

pub static ALERT_DELIVERIES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_rotation_alert_deliveries_total",
        "Alert deliveries by status",
        &["status"]
    )
    .expect("Failed to register alert_deliveries metric")
});

/// Session store call latency histogram.
pub static STORE_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "token_rotation_store_latency_seconds",
        "Session store operation latency in seconds",
        &["operation"],
        vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register store_latency metric")
});

/// Record a signed token.
pub fn record_token_issued(token_type: &str) {
    TOKENS_ISSUED.with_label_values(&[token_type]).inc();
}

pub fn record_issuance(outcome: &str) {
    ISSUANCE_OUTCOMES.with_label_values(&[outcome]).inc();
}

pub fn record_refresh(outcome: &str) {
    REFRESH_OUTCOMES.with_label_values(&[outcome]).inc();
}

/// Record a security event.
pub fn record_security_event(event_type: &str) {
    SECURITY_EVENTS.with_label_values(&[event_type]).inc();
}

pub fn record_alert_delivery(status: &str) {
    ALERT_DELIVERIES.with_label_values(&[status]).inc();
}

/// Record a store call latency.
pub fn record_store_latency(operation: &str, duration_secs: f64) {
    STORE_LATENCY
        .with_label_values(&[operation])
        .observe(duration_secs);
}

/// Render the default registry in the Prometheus text format.
pub fn render() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
