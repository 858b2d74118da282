//! # Retry Handler
//!
//! Owns every label write after the facade hands it over, and guarantees that:
//!
//! 1. No notification reaches the API server before the initial label
//!    snapshot has been written (the initial-state gate).
//! 2. Failed writes are retried on a fixed cadence until they land.
//! 3. Pending writes on the same JSON pointer collapse to the latest intent.
//!
//! All state sits behind one async mutex, held across the API call so a
//! retry round and a live notification can never interleave on the wire.
//! Errors are logged, never returned.

use super::error::RegistrationError;
use crate::client::{ClientError, Patch, PodApi};
use crate::observability::metrics;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// The first label push, replayed until it succeeds
#[async_trait]
pub trait InitialStateAction: Send + Sync {
    async fn apply(&self) -> Result<(), RegistrationError>;
}

/// Initial-state gate
///
/// Notifications are transmitted only in `Done`; before that they are recorded.
enum InitialState {
    /// No initial push has been attempted yet
    Unarmed,
    /// The initial push failed and is retried on every tick
    Pending(Box<dyn InitialStateAction>),
    Done,
}

impl InitialState {
    fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

struct Inner {
    initial_state: InitialState,
    /// Latest pending patch per JSON pointer
    patches_to_retry: HashMap<String, Patch>,
    /// Set once the terminal labels were written; nothing is sent afterwards
    stopped: bool,
}

impl Inner {
    fn store(&mut self, patch: Patch) {
        self.patches_to_retry.insert(patch.path.clone(), patch);
        metrics::set_pending_patches(self.patches_to_retry.len());
    }

    fn discard(&mut self, path: &str) {
        if self.patches_to_retry.remove(path).is_some() {
            metrics::set_pending_patches(self.patches_to_retry.len());
        }
    }
}

/// Retries label patches that could not be written
pub struct RetryHandler {
    namespace: String,
    pod_name: String,
    client: Arc<dyn PodApi>,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for RetryHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryHandler")
            .field("namespace", &self.namespace)
            .field("pod_name", &self.pod_name)
            .finish_non_exhaustive()
    }
}

impl RetryHandler {
    pub fn new(
        namespace: impl Into<String>,
        pod_name: impl Into<String>,
        client: Arc<dyn PodApi>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            pod_name: pod_name.into(),
            client,
            inner: Mutex::new(Inner {
                initial_state: InitialState::Unarmed,
                patches_to_retry: HashMap::new(),
                stopped: false,
            }),
        }
    }

    /// Attempt the initial push now, keeping it for later ticks if it fails
    pub async fn set_initial_state(&self, action: Box<dyn InitialStateAction>) {
        let mut inner = self.inner.lock().await;
        match action.apply().await {
            Ok(()) => {
                info!(
                    namespace = %self.namespace,
                    pod = %self.pod_name,
                    "Initial pod labels set"
                );
                inner.initial_state = InitialState::Done;
            }
            Err(e) => {
                warn!(error = %e, "Unable to set initial state, will retry");
                inner.initial_state = InitialState::Pending(action);
            }
        }
    }

    /// Transmit `patch` now if the gate is open, otherwise record it
    ///
    /// A recorded patch replaces any pending patch on the same path.
    pub async fn notify(&self, patch: Patch) {
        let mut inner = self.inner.lock().await;

        if inner.stopped {
            debug!(path = %patch.path, "Registration stopped, recording patch only");
            inner.store(patch);
            return;
        }

        // A late initial snapshot would smash newer values, so hold everything
        // until it has been written.
        if !inner.initial_state.is_done() {
            warn!(
                path = %patch.path,
                "Cannot notify of present state because initial state is unset, will retry"
            );
            inner.store(patch);
            return;
        }

        match self
            .client
            .patch_pod(&self.namespace, &self.pod_name, std::slice::from_ref(&patch))
            .await
        {
            // An older pending value on this path is now stale
            Ok(()) => inner.discard(&patch.path),
            Err(e) => {
                log_patch_failure(&e, &patch.path);
                inner.store(patch);
            }
        }
    }

    /// One reconciliation round: initial state first, then all pending patches
    /// in a single batch
    pub async fn retry(&self) {
        let mut inner = self.inner.lock().await;
        if inner.stopped {
            return;
        }

        match &inner.initial_state {
            InitialState::Done => {}
            InitialState::Unarmed => return,
            InitialState::Pending(action) => {
                if let Err(e) = action.apply().await {
                    warn!(error = %e, "Unable to set initial state, will retry");
                    metrics::increment_retry_rounds("initial_state_failed");
                    return;
                }
                info!(
                    namespace = %self.namespace,
                    pod = %self.pod_name,
                    "Initial pod labels set on retry"
                );
                inner.initial_state = InitialState::Done;
            }
        }

        if inner.patches_to_retry.is_empty() {
            return;
        }

        // Order across paths is not significant
        let patches: Vec<Patch> = inner.patches_to_retry.values().cloned().collect();
        match self
            .client
            .patch_pod(&self.namespace, &self.pod_name, &patches)
            .await
        {
            Ok(()) => {
                debug!(count = patches.len(), "Pending label patches written");
                inner.patches_to_retry.clear();
                metrics::set_pending_patches(0);
                metrics::increment_retry_rounds("success");
            }
            Err(e) => {
                warn!(
                    error = %e,
                    count = patches.len(),
                    "Unable to update state, will retry"
                );
                metrics::increment_retry_rounds("failure");
            }
        }
    }

    /// Write the terminal labels and stop transmitting
    ///
    /// Waits for an in-flight round to finish first, so nothing this handler
    /// sends can land after the terminal write.
    ///
    /// # Errors
    /// Returns the API error; the caller decides how to report it.
    pub async fn shutdown(&self, terminal_patches: &[Patch]) -> Result<(), ClientError> {
        let mut inner = self.inner.lock().await;
        inner.stopped = true;
        self.client
            .patch_pod(&self.namespace, &self.pod_name, terminal_patches)
            .await
    }

    /// Spawn the retry loop on `tracker`; it exits when `shutdown` is cancelled
    pub fn run(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
        tracker: &TaskTracker,
    ) {
        let handler = Arc::clone(self);
        tracker.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    () = shutdown.cancelled() => {
                        debug!("Retry loop stopped");
                        return;
                    }
                    _ = ticker.tick() => handler.retry().await,
                }
            }
        });
    }

    /// Snapshot of the pending patches, keyed by path
    pub async fn pending(&self) -> HashMap<String, Patch> {
        self.inner.lock().await.patches_to_retry.clone()
    }

    /// Whether the initial push has succeeded
    pub async fn is_initial_state_set(&self) -> bool {
        self.inner.lock().await.initial_state.is_done()
    }
}

fn log_patch_failure(error: &ClientError, path: &str) {
    if matches!(error, ClientError::NotFound) {
        // Kept pending like any other failure: the pod may come back
        warn!(path = %path, "Pod not found while updating state, will retry");
    } else {
        warn!(
            error = %error,
            path = %path,
            transient = error.is_transient(),
            "Unable to update state, will retry"
        );
    }
}
