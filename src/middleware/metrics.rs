//! Prometheus metrics for the meeting and translation paths.
//!
//! Exposes a standard `/metrics` endpoint that Prometheus can scrape.
//! Everything lives in the global default registry and is registered on
//! first use, so tests can build as many app instances as they like.

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use once_cell::sync::Lazy;
use prometheus::{
    opts, register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder,
    HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};
use std::time::Instant;

static MEETING_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!(
            "meetbridge_meeting_lookups_total",
            "Registry lookups by outcome (hit, stale, miss)"
        ),
        &["outcome"]
    )
    .expect("failed to register meetbridge_meeting_lookups_total")
});

static MEETINGS_CREATED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "meetbridge_meetings_created_total",
        "Remote meetings created"
    ))
    .expect("failed to register meetbridge_meetings_created_total")
});

static TOKEN_EXCHANGES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!(
            "meetbridge_token_exchanges_total",
            "Client-credentials token exchanges"
        ),
        &["result"]
    )
    .expect("failed to register meetbridge_token_exchanges_total")
});

static UPSTREAM_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!(
            "meetbridge_upstream_errors_total",
            "Failed calls to remote services"
        ),
        &["service", "kind"]
    )
    .expect("failed to register meetbridge_upstream_errors_total")
});

static REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        prometheus::histogram_opts!(
            "meetbridge_http_request_duration_seconds",
            "HTTP request latency in seconds",
            vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
        ),
        &["route", "status"]
    )
    .expect("failed to register meetbridge_http_request_duration_seconds")
});

/// Outcome of looking a transaction up in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    /// Cached and still live at the provider.
    Hit,
    /// Cached but gone at the provider; evicted.
    Stale,
    /// Nothing cached.
    Miss,
}

impl LookupOutcome {
    fn as_str(self) -> &'static str {
        match self {
            LookupOutcome::Hit => "hit",
            LookupOutcome::Stale => "stale",
            LookupOutcome::Miss => "miss",
        }
    }
}

pub fn record_lookup(outcome: LookupOutcome) {
    MEETING_LOOKUPS.with_label_values(&[outcome.as_str()]).inc();
}

pub fn record_meeting_created() {
    MEETINGS_CREATED.inc();
}

pub fn record_token_exchange(ok: bool) {
    let result = if ok { "ok" } else { "error" };
    TOKEN_EXCHANGES.with_label_values(&[result]).inc();
}

pub fn record_upstream_error(service: &str, kind: &str) {
    UPSTREAM_ERRORS.with_label_values(&[service, kind]).inc();
}

/// Middleware: observes request latency labelled by route template and status.
/// Unmatched paths are bucketed as "unmatched" to bound cardinality.
pub async fn track_http(req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    let resp = next.run(req).await;

    REQUEST_DURATION
        .with_label_values(&[&route, resp.status().as_str()])
        .observe(start.elapsed().as_secs_f64());
    resp
}

/// Encode all registered metrics as Prometheus text format.
/// Called by the `/metrics` HTTP handler.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap_or_default();
    String::from_utf8(buffer).unwrap_or_default()
}
