//! # Metrics Registry
//!
//! Prometheus metrics registry setup and registration.

use anyhow::Result;
use prometheus::Registry;
use std::sync::LazyLock;

/// Crate-level Prometheus metrics registry
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Register all metrics with the Prometheus registry
///
/// Metrics are recorded whether or not they are registered; registering
/// only makes them visible to [`registry`] consumers.
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    super::registration_metrics::register_registration_metrics()?;
    Ok(())
}

/// Registry to expose from the embedding daemon's metrics endpoint
pub fn registry() -> &'static Registry {
    &REGISTRY
}
