//! # Shutdown Labels
//!
//! On shutdown the pod is stamped as inactive and sealed in one patch. There
//! is no retry: the process is about to exit and the pod's own lifecycle
//! events report liveness shortly after.

use super::retry::RetryHandler;
use super::state::bool_label_patch;
use crate::client::Patch;
use crate::constants::{LABEL_ACTIVE, LABEL_INITIALIZED, LABEL_PERF_STANDBY, LABEL_SEALED};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info};

/// Labels left on the pod once the daemon has stopped
pub fn terminal_patches() -> Vec<Patch> {
    vec![
        bool_label_patch(LABEL_ACTIVE, false),
        bool_label_patch(LABEL_SEALED, true),
        bool_label_patch(LABEL_PERF_STANDBY, false),
        bool_label_patch(LABEL_INITIALIZED, false),
    ]
}

/// Spawn a task on `tracker` that writes the terminal labels once `shutdown` fires
pub(crate) fn spawn_on_shutdown(
    handler: Arc<RetryHandler>,
    shutdown: CancellationToken,
    tracker: &TaskTracker,
) {
    tracker.spawn(async move {
        shutdown.cancelled().await;
        match handler.shutdown(&terminal_patches()).await {
            Ok(()) => info!("Pod labels set to shutdown state"),
            Err(e) => error!(error = %e, "Unable to set pod labels to shutdown state"),
        }
    });
}
