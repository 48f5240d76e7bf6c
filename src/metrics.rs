use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, Histogram, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};
use std::time::Instant;

use crate::{DataSourceError, Result};

lazy_static! {
    pub static ref SERVICE_UP: IntGauge = register_int_gauge!(
        "sample_datasource_up",
        "Whether the data source service is up (1) or down (0)"
    ).unwrap();

    // Request metrics
    pub static ref REQUEST_COUNTER: IntCounter = register_int_counter!(
        "sample_datasource_requests_total",
        "Total number of API requests received"
    ).unwrap();

    pub static ref REQUEST_DURATION: Histogram = register_histogram!(
        "sample_datasource_request_duration_seconds",
        "API request duration in seconds",
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]
    ).unwrap();

    // Query pipeline metrics
    pub static ref QUERY_BATCHES: IntCounterVec = register_int_counter_vec!(
        "sample_query_batches_total",
        "Query batches executed, by outcome",
        &["outcome"]
    ).unwrap();

    pub static ref SAMPLE_FETCHES: IntCounterVec = register_int_counter_vec!(
        "sample_fetches_total",
        "Sample fetches issued to the remote service, by outcome",
        &["outcome"]
    ).unwrap();

    pub static ref FETCH_DURATION: Histogram = register_histogram!(
        "sample_fetch_duration_seconds",
        "Duration of sample fetches in seconds",
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]
    ).unwrap();

    pub static ref ROWS_RETURNED: IntCounter = register_int_counter!(
        "sample_rows_returned_total",
        "Total number of frame rows returned"
    ).unwrap();
}

pub fn init_metrics() {
    SERVICE_UP.set(1);
}

pub struct RequestTimer {
    start: Instant,
}

impl RequestTimer {
    pub fn new() -> Self {
        REQUEST_COUNTER.inc();
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for RequestTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        REQUEST_DURATION.observe(duration);
    }
}

fn outcome(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

pub fn record_batch(success: bool) {
    QUERY_BATCHES.with_label_values(&[outcome(success)]).inc();
}

pub fn record_fetch(success: bool) {
    SAMPLE_FETCHES.with_label_values(&[outcome(success)]).inc();
}

pub fn record_rows(rows: usize) {
    ROWS_RETURNED.inc_by(rows as u64);
}

/// Renders every registered metric in the Prometheus text format.
pub fn render() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| DataSourceError::Internal(format!("Failed to encode metrics: {}", e)))?;

    String::from_utf8(buffer)
        .map_err(|e| DataSourceError::Internal(format!("Metrics are not valid UTF-8: {}", e)))
}
