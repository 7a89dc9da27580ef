use axum::{http::StatusCode, response::IntoResponse};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::error;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub fn init_metrics() {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = PROMETHEUS_HANDLE.set(handle);

            // Pre-register so the first scrape sees every series.
            counter!("whois_requests_total", "kind" => "domain").absolute(0);
            counter!("whois_requests_total", "kind" => "ip").absolute(0);
            counter!("whois_requests_total", "kind" => "asn").absolute(0);
            counter!("whois_cache_hits_total").absolute(0);
            counter!("whois_cache_misses_total").absolute(0);
            counter!("whois_errors_total", "error_type" => "unknown").absolute(0);
            gauge!("whois_in_flight_requests").set(0.0);
            histogram!("whois_request_duration_seconds").record(0.0);
        }
        Err(e) => {
            error!("Failed to install metrics recorder: {e}");
        }
    }
}

pub fn increment_requests(kind: &'static str) {
    counter!("whois_requests_total", "kind" => kind).increment(1);
}

pub fn increment_cache_hits() {
    counter!("whois_cache_hits_total").increment(1);
}

pub fn increment_cache_misses() {
    counter!("whois_cache_misses_total").increment(1);
}

pub fn increment_errors(error_type: &str) {
    counter!("whois_errors_total", "error_type" => error_type.to_string()).increment(1);
}

pub fn set_in_flight(count: usize) {
    gauge!("whois_in_flight_requests").set(count as f64);
}

pub fn record_query_time(duration: Duration) {
    histogram!("whois_request_duration_seconds").record(duration.as_secs_f64());
}

pub async fn metrics_handler() -> impl IntoResponse {
    match PROMETHEUS_HANDLE.get() {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Metrics not initialized".to_string(),
        ),
    }
}
