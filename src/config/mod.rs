//! # Configuration
//!
//! In-cluster connection settings and the pod coordinates to label.
//!
//! - `in_cluster` - API server URL, bearer token and CA bundle from the pod's mounts
//! - `registration` - namespace, pod name and retry cadence

mod error;
mod in_cluster;
mod registration;

pub use error::ConfigError;
pub use in_cluster::{join_host_port, Config, InClusterPaths};
pub use registration::RegistrationConfig;
