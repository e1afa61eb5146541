//! Metrics module for logistics-billing-service.
//! Provides Prometheus metrics for invoice generation and freight quoting.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, opts, register_counter, register_histogram_vec, register_int_counter_vec,
    Counter, Encoder, HistogramVec, IntCounterVec, TextEncoder,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::OnceLock;

/// Database query duration histogram
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        histogram_opts!(
            "logistics_billing_db_query_duration_seconds",
            "Database query duration"
        ),
        &["operation"]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Recorder for the `metrics` crate macros used by the HTTP middleware
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Invoices generated, by contract cadence
pub static INVOICES_GENERATED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Sum of generated invoice totals
pub static INVOICE_AMOUNT_TOTAL: OnceLock<Counter> = OnceLock::new();

/// Freight quotes, by mode and outcome
pub static FREIGHT_QUOTES_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Error counter for alerting
pub static ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Call once at startup.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_none() {
        match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                let _ = METRICS_HANDLE.set(handle);
            }
            Err(e) => tracing::warn!(error = %e, "Metrics recorder not installed"),
        }
    }

    INVOICES_GENERATED_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "logistics_billing_invoices_generated_total",
                "Total invoices generated by billing cadence"
            ),
            &["cadence"]
        )
        .expect("Failed to register INVOICES_GENERATED_TOTAL")
    });

    INVOICE_AMOUNT_TOTAL.get_or_init(|| {
        register_counter!(opts!(
            "logistics_billing_invoice_amount_total",
            "Total amount of generated invoices"
        ))
        .expect("Failed to register INVOICE_AMOUNT_TOTAL")
    });

    FREIGHT_QUOTES_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "logistics_billing_freight_quotes_total",
                "Total freight quote requests by mode and outcome"
            ),
            &["mode", "outcome"]
        )
        .expect("Failed to register FREIGHT_QUOTES_TOTAL")
    });

    ERRORS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "logistics_billing_errors_total",
                "Total errors by type for alerting"
            ),
            &["error_type", "operation"]
        )
        .expect("Failed to register ERRORS_TOTAL")
    });

    // Force initialization of lazy statics
    let _ = &*DB_QUERY_DURATION;
}

/// Get metrics in Prometheus text format: HTTP metrics first, then the
/// service counters.
pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_default();

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return output;
    }
    if let Ok(service_metrics) = String::from_utf8(buffer) {
        output.push_str(&service_metrics);
    }
    output
}

/// Record a generated invoice and its total.
pub fn record_invoice_generated(cadence: &str, total: Decimal) {
    if let Some(counter) = INVOICES_GENERATED_TOTAL.get() {
        counter.with_label_values(&[cadence]).inc();
    }
    if let Some(counter) = INVOICE_AMOUNT_TOTAL.get() {
        counter.inc_by(total.to_f64().unwrap_or(0.0).abs());
    }
}

/// Record a freight quote request.
pub fn record_freight_quote(mode: &str, outcome: &str) {
    if let Some(counter) = FREIGHT_QUOTES_TOTAL.get() {
        counter.with_label_values(&[mode, outcome]).inc();
    }
}

/// Record an error for alerting.
pub fn record_error(error_type: &str, operation: &str) {
    if let Some(counter) = ERRORS_TOTAL.get() {
        counter.with_label_values(&[error_type, operation]).inc();
    }
}
