use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

// ---------------------------------------------------------------------------
// Metrics catalog
// ---------------------------------------------------------------------------

/// Register all metric descriptors at startup.
///
/// This must be called once before any metrics are recorded.
/// Descriptors provide human-readable descriptions for Prometheus.
pub fn describe_all_metrics() {
    // -- Ingest --
    describe_counter!(
        "clipstream_uploads_total",
        "Upload attempts by category and result"
    );
    describe_histogram!("clipstream_upload_size_bytes", "Accepted upload size");
    describe_histogram!(
        "clipstream_upload_duration_seconds",
        "Time from request start to persisted object"
    );

    // -- Storage --
    describe_histogram!(
        "clipstream_storage_get_duration_seconds",
        "Object lookup latency"
    );
    describe_histogram!(
        "clipstream_storage_put_duration_seconds",
        "Object create latency"
    );
    describe_counter!(
        "clipstream_storage_errors_total",
        "Storage operation errors"
    );
    describe_counter!("clipstream_cache_hits_total", "Object cache hits");
    describe_counter!("clipstream_cache_misses_total", "Object cache misses");
    describe_gauge!("clipstream_cache_size_bytes", "Current cache memory usage");
    describe_gauge!("clipstream_cache_entries", "Current number of cached objects");

    // -- Delivery --
    describe_counter!(
        "clipstream_delivery_requests_total",
        "Playback requests by status and kind (full, partial)"
    );
    describe_counter!(
        "clipstream_delivery_not_found_total",
        "404 responses by internal reason"
    );
    describe_counter!(
        "clipstream_delivery_integrity_faults_total",
        "Objects whose size_bytes disagreed with the stored payload"
    );
    describe_histogram!(
        "clipstream_delivery_request_duration_seconds",
        "Playback response latency"
    );
    describe_counter!(
        "clipstream_delivery_bytes_sent_total",
        "Total body bytes served"
    );

    // -- System --
    describe_gauge!("clipstream_uptime_seconds", "Process uptime");
    describe_counter!(
        "clipstream_panic_total",
        "Total panics caught (should always be 0)"
    );
    describe_gauge!(
        "clipstream_shutdown_in_progress",
        "1 if graceful shutdown is in progress, 0 otherwise"
    );
}

// -- Ingest --

pub fn inc_upload(category: &str, result: &str) {
    counter!("clipstream_uploads_total", "category" => category.to_string(), "result" => result.to_string()).increment(1);
}

pub fn record_upload_size(category: &str, bytes: f64) {
    histogram!("clipstream_upload_size_bytes", "category" => category.to_string()).record(bytes);
}

pub fn record_upload_duration(category: &str, seconds: f64) {
    histogram!("clipstream_upload_duration_seconds", "category" => category.to_string())
        .record(seconds);
}

// -- Storage --

pub fn record_storage_get_duration(seconds: f64) {
    histogram!("clipstream_storage_get_duration_seconds").record(seconds);
}

pub fn record_storage_put_duration(seconds: f64) {
    histogram!("clipstream_storage_put_duration_seconds").record(seconds);
}

pub fn inc_storage_error(operation: &str) {
    counter!("clipstream_storage_errors_total", "operation" => operation.to_string()).increment(1);
}

pub fn inc_cache_hit() {
    counter!("clipstream_cache_hits_total").increment(1);
}

pub fn inc_cache_miss() {
    counter!("clipstream_cache_misses_total").increment(1);
}

pub fn set_cache_size_bytes(bytes: f64) {
    gauge!("clipstream_cache_size_bytes").set(bytes);
}

pub fn set_cache_entries(count: f64) {
    gauge!("clipstream_cache_entries").set(count);
}

// -- Delivery --

pub fn inc_delivery_request(status: u16, kind: &str) {
    counter!("clipstream_delivery_requests_total", "status" => status_bucket(status), "kind" => kind.to_string()).increment(1);
}

pub fn inc_delivery_not_found(reason: &str) {
    counter!("clipstream_delivery_not_found_total", "reason" => reason.to_string()).increment(1);
}

pub fn inc_delivery_integrity_fault() {
    counter!("clipstream_delivery_integrity_faults_total").increment(1);
}

pub fn record_delivery_request_duration(kind: &str, seconds: f64) {
    histogram!("clipstream_delivery_request_duration_seconds", "kind" => kind.to_string())
        .record(seconds);
}

pub fn add_delivery_bytes_sent(bytes: u64) {
    counter!("clipstream_delivery_bytes_sent_total").increment(bytes);
}

// -- System --

pub fn set_uptime_seconds(seconds: f64) {
    gauge!("clipstream_uptime_seconds").set(seconds);
}

pub fn inc_panic_total() {
    counter!("clipstream_panic_total").increment(1);
}

pub fn set_shutdown_in_progress(in_progress: bool) {
    gauge!("clipstream_shutdown_in_progress").set(if in_progress { 1.0 } else { 0.0 });
}

// ---------------------------------------------------------------------------
// Status code bucket helper
// ---------------------------------------------------------------------------

/// Collapse an HTTP status into its class label (`2xx`, `4xx`, ...).
pub fn status_bucket(status: u16) -> &'static str {
    match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

// ---------------------------------------------------------------------------
// Uptime tracking task
// ---------------------------------------------------------------------------

/// Background task that updates the uptime gauge every second.
pub async fn run_uptime_task(start_time: Instant, cancel: tokio_util::sync::CancellationToken) {
    let interval = std::time::Duration::from_secs(1);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(interval) => {
                set_uptime_seconds(start_time.elapsed().as_secs_f64());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Prometheus recorder installation
// ---------------------------------------------------------------------------

/// Install the Prometheus metrics recorder as the global `metrics` recorder.
///
/// Returns a handle that renders the Prometheus text exposition format.
pub fn install_prometheus_recorder(
) -> Result<metrics_exporter_prometheus::PrometheusHandle, metrics_exporter_prometheus::BuildError>
{
    metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()
}

/// Build a recorder handle without installing it globally.
///
/// Used when metrics are disabled and in tests, so `/metrics` still renders.
pub fn detached_prometheus_handle() -> metrics_exporter_prometheus::PrometheusHandle {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .build_recorder()
        .handle()
}
