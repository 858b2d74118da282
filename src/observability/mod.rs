//! # Observability
//!
//! Prometheus metrics. Logging goes through `tracing`; installing a
//! subscriber is left to the embedding daemon.

pub mod metrics;
