//! # Kubernetes Service Registration
//!
//! Publishes a secret-management daemon's runtime state as labels on the
//! Kubernetes pod it runs in, so selectors can route traffic to the active
//! node, exclude sealed nodes, and so on.
//!
//! ## Overview
//!
//! 1. **Configuration** - in-cluster credentials (API server address, service
//!    account token, cluster CA) and the pod's coordinates
//! 2. **Pod client** - authenticated GET and JSON-Patch against the single pod
//!    resource, with bearer-token refresh on 401/403
//! 3. **Registration** - initial label snapshot, live notifications, periodic
//!    retry of failed writes and terminal labels on shutdown
//!
//! ## Labels
//!
//! | Label | Value |
//! |-------|-------|
//! | `vault-version` | daemon version string |
//! | `vault-ha-active` | `"true"` / `"false"` |
//! | `vault-ha-sealed` | `"true"` / `"false"` |
//! | `vault-ha-perf-standby` | `"true"` / `"false"` |
//! | `vault-ha-initialized` | `"true"` / `"false"` |
//!
//! ## Usage
//!
//! ```no_run
//! use k8s_service_registration::{ServiceRegistration, State};
//! use std::collections::HashMap;
//! use tokio_util::sync::CancellationToken;
//! use tokio_util::task::TaskTracker;
//!
//! # async fn example() -> Result<(), k8s_service_registration::RegistrationError> {
//! let config = HashMap::from([
//!     ("namespace".to_string(), "vault".to_string()),
//!     ("pod_name".to_string(), "vault-0".to_string()),
//! ]);
//! let registration = ServiceRegistration::in_cluster(&config, State::default())?;
//!
//! let shutdown = CancellationToken::new();
//! let tracker = TaskTracker::new();
//! registration.run(shutdown.clone(), &tracker).await?;
//!
//! registration.notify_active_state_change(true).await;
//!
//! shutdown.cancel();
//! tracker.close();
//! tracker.wait().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod constants;
pub mod observability;
pub mod registration;

pub use client::{ClientError, KubeClient, Patch, PatchOperation, Pod, PodApi};
pub use config::{Config, ConfigError, InClusterPaths, RegistrationConfig};
pub use registration::{RegistrationError, ServiceRegistration, State};
