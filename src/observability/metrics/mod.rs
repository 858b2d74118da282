//! # Metrics Module
//!
//! Prometheus metrics for the service registration, organized by responsibility.
//!
//! ## Sub-modules
//!
//! - `registry` - Metrics registry setup and registration
//! - `registration_metrics` - API requests, token refreshes, pending patches, retry rounds

pub mod registration_metrics;
pub mod registry;

pub use registration_metrics::*;
pub use registry::*;
