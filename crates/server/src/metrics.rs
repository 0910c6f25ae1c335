//! Prometheus metrics for the stevedore server.
//!
//! The `/metrics` endpoint is unauthenticated to allow Prometheus scraping
//! and should be network-restricted at the infrastructure level.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{self, Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static PUSH_REQUESTS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "stevedore_push_requests_total",
        "Total number of push reconciliation requests",
    )
    .expect("metric creation failed")
});

pub static PUSHES_COMPLETED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "stevedore_pushes_completed_total",
        "Total number of pushes that reached manifest commit",
    )
    .expect("metric creation failed")
});

pub static REQUIREMENTS_ISSUED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "stevedore_requirements_issued_total",
        "Total number of upload requirements issued to clients",
    )
    .expect("metric creation failed")
});

pub static LAYERS_DEDUPLICATED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "stevedore_layers_deduplicated_total",
        "Total number of layers skipped because the blob already existed",
    )
    .expect("metric creation failed")
});

pub static PUSH_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "stevedore_push_duration_seconds",
            "Time taken to reconcile a push request",
        )
        .buckets(vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
    )
    .expect("metric creation failed")
});

/// Guard to ensure metrics are only registered once.
static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
///
/// Idempotent, so safe to call from integration tests that build multiple
/// routers.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(PUSH_REQUESTS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(PUSHES_COMPLETED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(REQUIREMENTS_ISSUED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(LAYERS_DEDUPLICATED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(PUSH_DURATION.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        // This would panic if any metric creation failed
        register_metrics();
        register_metrics();
    }
}
