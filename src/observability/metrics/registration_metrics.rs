//! # Registration Metrics
//!
//! Metrics for label writes: API requests, token refreshes, pending patches
//! and retry rounds.

use crate::observability::metrics::registry::REGISTRY;
use anyhow::Result;
use prometheus::{IntCounter, IntCounterVec, IntGauge};
use std::sync::LazyLock;

static REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "k8s_service_registration_requests_total",
            "Total number of requests sent to the pod API, by method and outcome",
        ),
        &["method", "outcome"],
    )
    .expect("Failed to create REQUESTS_TOTAL metric - this should never happen")
});

static TOKEN_REFRESHES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "k8s_service_registration_token_refreshes_total",
        "Total number of bearer token refreshes after 401/403",
    )
    .expect("Failed to create TOKEN_REFRESHES_TOTAL metric - this should never happen")
});

static PENDING_PATCHES: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "k8s_service_registration_pending_patches",
        "Number of label patches waiting for retry",
    )
    .expect("Failed to create PENDING_PATCHES metric - this should never happen")
});

static RETRY_ROUNDS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "k8s_service_registration_retry_rounds_total",
            "Total number of retry rounds that transmitted, by outcome",
        ),
        &["outcome"],
    )
    .expect("Failed to create RETRY_ROUNDS_TOTAL metric - this should never happen")
});

/// Register registration metrics with the registry
pub(crate) fn register_registration_metrics() -> Result<()> {
    REGISTRY.register(Box::new(REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(TOKEN_REFRESHES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PENDING_PATCHES.clone()))?;
    REGISTRY.register(Box::new(RETRY_ROUNDS_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_requests(method: &str, outcome: &str) {
    REQUESTS_TOTAL
        .with_label_values(&[method, outcome])
        .inc();
}

pub fn increment_token_refreshes() {
    TOKEN_REFRESHES_TOTAL.inc();
}

pub fn set_pending_patches(count: usize) {
    PENDING_PATCHES.set(i64::try_from(count).unwrap_or(i64::MAX));
}

pub fn increment_retry_rounds(outcome: &str) {
    RETRY_ROUNDS_TOTAL.with_label_values(&[outcome]).inc();
}
