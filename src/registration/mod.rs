//! # Service Registration
//!
//! Reflects the daemon's state as labels on the pod it runs in.
//!
//! ## Lifecycle
//!
//! 1. [`ServiceRegistration::run`] verifies the pod exists, writes the initial
//!    label snapshot (or arms the retry handler to write it later), and spawns
//!    the retry loop and the shutdown task.
//! 2. Each `notify_*` call turns a state change into one label patch. The
//!    retry handler sends it right away once the snapshot has landed, and
//!    keeps it for the next round otherwise.
//! 3. When the shutdown token fires the pod is stamped inactive and sealed.
//!
//! Notification failures never reach the caller.

mod error;
mod retry;
mod shutdown;
mod state;

pub use error::RegistrationError;
pub use retry::{InitialStateAction, RetryHandler};
pub use shutdown::terminal_patches;
pub use state::{bool_label, bool_label_patch, label_path, State};

use crate::client::{KubeClient, PodApi, Pod};
use crate::config::{Config, RegistrationConfig};
use crate::constants::{LABEL_ACTIVE, LABEL_INITIALIZED, LABEL_PERF_STANDBY, LABEL_SEALED};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

/// Pod-label service registration
pub struct ServiceRegistration {
    config: RegistrationConfig,
    client: Arc<dyn PodApi>,
    initial_state: State,
    retry_handler: Arc<RetryHandler>,
}

impl std::fmt::Debug for ServiceRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistration")
            .field("config", &self.config)
            .field("initial_state", &self.initial_state)
            .finish_non_exhaustive()
    }
}

impl ServiceRegistration {
    pub fn new(config: RegistrationConfig, client: Arc<dyn PodApi>, initial_state: State) -> Self {
        let retry_handler = Arc::new(RetryHandler::new(
            config.namespace.clone(),
            config.pod_name.clone(),
            Arc::clone(&client),
        ));
        Self {
            config,
            client,
            initial_state,
            retry_handler,
        }
    }

    /// Build a registration for the pod this process runs in
    ///
    /// Pod coordinates come from `config_map` (or their environment
    /// overrides); credentials from the service account mounts.
    ///
    /// # Errors
    /// Configuration errors, including `NotInCluster`.
    pub fn in_cluster(
        config_map: &HashMap<String, String>,
        initial_state: State,
    ) -> Result<Self, RegistrationError> {
        let config = RegistrationConfig::from_config_map(config_map)?;
        let client = KubeClient::new(Config::load()?)?;
        Ok(Self::new(config, Arc::new(client), initial_state))
    }

    /// Verify the pod, push the initial labels and start the background tasks
    ///
    /// Tasks are spawned on `tracker` so the caller can wait for them after
    /// cancelling `shutdown`. A failed initial push is not an error here; it
    /// is retried in the background and holds back every notification.
    ///
    /// # Errors
    /// The pod cannot be fetched (including `NotFound`) or has no metadata.
    pub async fn run(
        &self,
        shutdown: CancellationToken,
        tracker: &TaskTracker,
    ) -> Result<(), RegistrationError> {
        let namespace = &self.config.namespace;
        let pod_name = &self.config.pod_name;

        let pod = self.client.get_pod(namespace, pod_name).await?;
        if pod.metadata.is_none() {
            return Err(RegistrationError::MissingMetadata {
                namespace: namespace.clone(),
                pod_name: pod_name.clone(),
            });
        }
        info!(namespace = %namespace, pod = %pod_name, "Registering pod labels");

        let action = InitialLabels {
            client: Arc::clone(&self.client),
            namespace: namespace.clone(),
            pod_name: pod_name.clone(),
            state: self.initial_state.clone(),
            prefetched: Mutex::new(Some(pod)),
        };
        self.retry_handler.set_initial_state(Box::new(action)).await;

        shutdown::spawn_on_shutdown(Arc::clone(&self.retry_handler), shutdown.clone(), tracker);
        self.retry_handler
            .run(self.config.retry_interval, shutdown, tracker);
        Ok(())
    }

    pub async fn notify_active_state_change(&self, is_active: bool) {
        self.notify(LABEL_ACTIVE, is_active).await;
    }

    pub async fn notify_sealed_state_change(&self, is_sealed: bool) {
        self.notify(LABEL_SEALED, is_sealed).await;
    }

    pub async fn notify_performance_standby_state_change(&self, is_standby: bool) {
        self.notify(LABEL_PERF_STANDBY, is_standby).await;
    }

    pub async fn notify_initialized_state_change(&self, is_initialized: bool) {
        self.notify(LABEL_INITIALIZED, is_initialized).await;
    }

    /// Nothing on the pod depends on the daemon's configuration
    #[allow(clippy::unused_async, reason = "matches the other notifications")]
    pub async fn notify_configuration_reload(&self) {
        debug!("Configuration reloaded, pod labels unchanged");
    }

    pub fn retry_handler(&self) -> &Arc<RetryHandler> {
        &self.retry_handler
    }

    async fn notify(&self, label: &str, value: bool) {
        self.retry_handler
            .notify(bool_label_patch(label, value))
            .await;
    }
}

/// First label push for a registration
///
/// The pod fetched by `run` is reused on the first attempt; later attempts
/// fetch it again in case the labels field has appeared in the meantime.
struct InitialLabels {
    client: Arc<dyn PodApi>,
    namespace: String,
    pod_name: String,
    state: State,
    prefetched: Mutex<Option<Pod>>,
}

#[async_trait]
impl InitialStateAction for InitialLabels {
    async fn apply(&self) -> Result<(), RegistrationError> {
        let prefetched = self.prefetched.lock().await.take();
        let pod = match prefetched {
            Some(pod) => pod,
            None => self.client.get_pod(&self.namespace, &self.pod_name).await?,
        };
        if pod.metadata.is_none() {
            return Err(RegistrationError::MissingMetadata {
                namespace: self.namespace.clone(),
                pod_name: self.pod_name.clone(),
            });
        }

        let patches = self.state.initial_patches(pod.labels().is_some());
        self.client
            .patch_pod(&self.namespace, &self.pod_name, &patches)
            .await?;
        Ok(())
    }
}
