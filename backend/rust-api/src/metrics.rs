use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Database Metrics (MongoDB)
    pub static ref DB_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "db_operations_total",
        "Total number of database operations",
        &["operation", "collection", "status"]
    )
    .unwrap();

    pub static ref DB_OPERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "db_operation_duration_seconds",
        "Database operation duration in seconds",
        &["operation", "collection"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .unwrap();

    // Business Metrics
    pub static ref QUIZ_ATTEMPTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_attempts_total",
        "Total number of stored quiz attempts",
        &["game_mode"]
    )
    .unwrap();

    pub static ref SESSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_sessions_total",
        "Total number of quiz sessions by lifecycle event",
        &["status"]
    )
    .unwrap();

    pub static ref SESSIONS_ACTIVE: IntGauge = register_int_gauge!(
        "quiz_sessions_active",
        "Number of quiz sessions currently in progress"
    )
    .unwrap();

    pub static ref ANSWERS_SUBMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "answers_submitted_total",
        "Total number of answers submitted",
        &["correct"]
    )
    .unwrap();

    pub static ref ASSESSMENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "assessments_total",
        "Total number of coach assessments served",
        &["source"]
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Helper: track database operation with metrics
pub async fn track_db_operation<F, T>(
    operation: &str,
    collection: &str,
    future: F,
) -> Result<T, anyhow::Error>
where
    F: std::future::Future<Output = Result<T, anyhow::Error>>,
{
    let start = std::time::Instant::now();
    let result = future.await;
    let duration = start.elapsed().as_secs_f64();

    let status = if result.is_ok() { "success" } else { "error" };

    DB_OPERATIONS_TOTAL
        .with_label_values(&[operation, collection, status])
        .inc();

    DB_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation, collection])
        .observe(duration);

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        let _ = HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/health", "200"])
            .get();
        let _ = QUIZ_ATTEMPTS_TOTAL.with_label_values(&["cubes"]).get();
    }

    #[test]
    fn test_render_metrics() {
        ASSESSMENTS_TOTAL.with_label_values(&["fallback"]).inc();

        let output = render_metrics().unwrap();
        assert!(output.contains("assessments_total"));
    }

    #[tokio::test]
    async fn test_track_db_operation_passes_result_through() {
        let ok = track_db_operation("find", "test_collection", async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err: anyhow::Result<()> =
            track_db_operation("find", "test_collection", async { anyhow::bail!("boom") }).await;
        assert!(err.is_err());
        assert!(
            DB_OPERATIONS_TOTAL
                .with_label_values(&["find", "test_collection", "error"])
                .get()
                >= 1
        );
    }
}
