
use prometheus::{Encoder, HistogramVec, IntCounterVec, Registry, TextEncoder};
use lazy_static::lazy_static;
use std::sync::OnceLock;
use std::time::Duration;
lazy_static! {
    static ref REGISTRY: Registry = Registry::new();
}
static REQ_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();
static STAGE_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
static OUTCOMES: OnceLock<IntCounterVec> = OnceLock::new();
/// Register collectors. Recording before this is a no-op.
pub fn init_metrics() -> anyhow::Result<()> {
    if REQ_COUNTER.get().is_none() {
        let counter = IntCounterVec::new(
            prometheus::opts!("assistant_requests_total", "Total requests per route"),
            &["route", "status"],
        )?;
        if REQ_COUNTER.set(counter.clone()).is_ok() {
            REGISTRY.register(Box::new(counter)).ok();
        }
    }

    if STAGE_SECONDS.get().is_none() {
        let histogram = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "assistant_stage_seconds",
                "Completion round-trip time per pipeline stage",
            )
            .buckets(vec![0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0]),
            &["stage"],
        )?;
        if STAGE_SECONDS.set(histogram.clone()).is_ok() {
            REGISTRY.register(Box::new(histogram)).ok();
        }
    }

    if OUTCOMES.get().is_none() {
        let outcomes = IntCounterVec::new(
            prometheus::opts!(
                "assistant_verification_outcomes_total",
                "Final answers by verification outcome"
            ),
            &["outcome"],
        )?;
        if OUTCOMES.set(outcomes.clone()).is_ok() {
            REGISTRY.register(Box::new(outcomes)).ok();
        }
    }
    Ok(())
}
pub fn inc_request(route: &str, status: &str) {
    if let Some(counter) = REQ_COUNTER.get() {
        counter.with_label_values(&[route, status]).inc();
    }
}
pub fn observe_stage(stage: &str, elapsed: Duration) {
    if let Some(histogram) = STAGE_SECONDS.get() {
        histogram.with_label_values(&[stage]).observe(elapsed.as_secs_f64());
    }
}
pub fn inc_outcome(outcome: &str) {
    if let Some(counter) = OUTCOMES.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}
/// Prometheus text exposition of everything registered.
pub fn render() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
#[cfg(feature = "cli")]
pub async fn get_metrics() -> axum::response::Response {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    match render() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
