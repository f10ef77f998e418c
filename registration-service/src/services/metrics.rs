//! Prometheus metrics for registration-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// HTTP request counter by method, route and status.
pub static HTTP_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "registration_http_requests_total",
        "Total number of HTTP requests",
        &["method", "route", "status"]
    )
    .expect("Failed to register http_requests_total")
});

/// HTTP request duration histogram by method and route.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "registration_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "route"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to register http_request_duration")
});

/// Payment counter by method and status.
pub static PAYMENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "registration_payments_total",
        "Total number of payments by method and status",
        &["method", "status"]
    )
    .expect("Failed to register payments_total")
});

/// Invoice counter by status.
pub static INVOICES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "registration_invoices_total",
        "Total number of invoices by status",
        &["status"] // pending, paid
    )
    .expect("Failed to register invoices_total")
});

/// Enrollment counter by action.
pub static ENROLLMENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "registration_enrollments_total",
        "Total number of enrollment changes by action",
        &["action"] // enroll, unenroll
    )
    .expect("Failed to register enrollments_total")
});

/// Rendered receipt counter by kind.
pub static RECEIPTS_RENDERED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "registration_receipts_rendered_total",
        "Total number of receipts rendered by kind",
        &["kind"] // single, multi, combined
    )
    .expect("Failed to register receipts_rendered_total")
});

/// SMS delivery counter by message kind and outcome.
pub static SMS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "registration_sms_total",
        "Total number of SMS notifications by kind and outcome",
        &["kind", "outcome"]
    )
    .expect("Failed to register sms_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "registration_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "registration_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&HTTP_REQUESTS_TOTAL);
    Lazy::force(&HTTP_REQUEST_DURATION);
    Lazy::force(&PAYMENTS_TOTAL);
    Lazy::force(&INVOICES_TOTAL);
    Lazy::force(&ENROLLMENTS_TOTAL);
    Lazy::force(&RECEIPTS_RENDERED_TOTAL);
    Lazy::force(&SMS_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
