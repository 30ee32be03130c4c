//! Metrics and observability utilities
//!
//! Provides metric descriptions with standardized naming conventions and
//! small recording helpers used across the pipeline. Recording is a no-op
//! until a recorder (e.g. the Prometheus exporter) is installed.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Metrics prefix for all FinRAG metrics
pub const METRICS_PREFIX: &str = "finrag";

/// Histogram buckets for local work (index search, chunking), in seconds
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
];

/// Buckets for remote model calls (typically slower)
pub const REMOTE_CALL_BUCKETS: &[f64] = &[
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.000,  // 2s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Query metrics
    describe_counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of top-level questions answered"
    );

    describe_histogram!(
        format!("{}_query_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end question latency in seconds"
    );

    describe_counter!(
        format!("{}_decomposition_fallbacks_total", METRICS_PREFIX),
        Unit::Count,
        "Decompositions that degraded to the original question"
    );

    describe_counter!(
        format!("{}_synthesis_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Answer syntheses that degraded to an error answer"
    );

    // Retrieval metrics
    describe_counter!(
        format!("{}_retrieval_rounds_total", METRICS_PREFIX),
        Unit::Count,
        "Total vector index searches"
    );

    describe_histogram!(
        format!("{}_retrieval_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Vector index search latency in seconds"
    );

    describe_counter!(
        format!("{}_passages_indexed_total", METRICS_PREFIX),
        Unit::Count,
        "Total passages appended to the vector index"
    );

    // Remote call metrics
    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API requests"
    );

    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Embedding generation latency in seconds"
    );

    describe_counter!(
        format!("{}_model_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total language-model API requests"
    );

    describe_histogram!(
        format!("{}_model_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Language-model completion latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Record a finished top-level question
pub fn record_query(duration_secs: f64, mode: &str, source_count: usize) {
    counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_query_duration_seconds", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .record(duration_secs);

    tracing::debug!(mode = mode, sources = source_count, "Query recorded");
}

pub fn record_decomposition_fallback(reason: &str) {
    counter!(
        format!("{}_decomposition_fallbacks_total", METRICS_PREFIX),
        "reason" => reason.to_string()
    )
    .increment(1);
}

pub fn record_synthesis_failure(mode: &str) {
    counter!(
        format!("{}_synthesis_failures_total", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .increment(1);
}

/// Helper to record one vector index search
pub fn record_retrieval(duration_secs: f64, filtered: bool, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_retrieval_rounds_total", METRICS_PREFIX),
        "filtered" => filtered.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(format!("{}_retrieval_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

pub fn record_indexing(passages: usize) {
    counter!(format!("{}_passages_indexed_total", METRICS_PREFIX)).increment(passages as u64);
}

/// Helper to record embedding metrics
pub fn record_embedding(duration_secs: f64, model: &str, batch_size: usize, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_embedding_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    }

    tracing::debug!(model = model, batch_size = batch_size, success = success, "Embedding call recorded");
}

/// Helper to record language-model metrics
pub fn record_model_call(duration_secs: f64, model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_model_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_model_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_sorted() {
        for buckets in [LATENCY_BUCKETS, REMOTE_CALL_BUCKETS] {
            let mut prev = 0.0;
            for &bucket in buckets {
                assert!(bucket > prev);
                prev = bucket;
            }
        }
    }

    #[test]
    fn test_recording_without_recorder() {
        register_metrics();
        record_query(0.2, "direct", 3);
        record_retrieval(0.001, true, true);
        record_model_call(1.5, "test-model", false);
        // Just verify it runs without panic
    }
}
