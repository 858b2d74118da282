//! # Daemon State
//!
//! Snapshot of the daemon's observable state and its translation into pod
//! label patches.

use crate::client::Patch;
use crate::constants::{
    LABEL_ACTIVE, LABEL_INITIALIZED, LABEL_PERF_STANDBY, LABEL_SEALED, LABEL_VERSION,
    PATH_TO_LABELS,
};
use std::collections::BTreeMap;

/// State of the daemon at the time the registration starts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State {
    pub version: String,
    pub is_initialized: bool,
    pub is_sealed: bool,
    pub is_active: bool,
    pub is_performance_standby: bool,
}

impl State {
    /// All five labels as they should appear on the pod
    pub fn labels(&self) -> BTreeMap<String, String> {
        [
            (LABEL_VERSION, self.version.clone()),
            (LABEL_ACTIVE, bool_label(self.is_active).to_string()),
            (LABEL_SEALED, bool_label(self.is_sealed).to_string()),
            (
                LABEL_PERF_STANDBY,
                bool_label(self.is_performance_standby).to_string(),
            ),
            (LABEL_INITIALIZED, bool_label(self.is_initialized).to_string()),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
    }

    /// Patches writing this state onto a pod
    ///
    /// JSON-Patch cannot replace under a missing path, so when the pod has no
    /// labels field the whole map is added in one operation.
    pub fn initial_patches(&self, labels_field_exists: bool) -> Vec<Patch> {
        if labels_field_exists {
            self.labels()
                .into_iter()
                .map(|(key, value)| Patch::replace(label_path(&key), value))
                .collect()
        } else {
            let labels = serde_json::Map::from_iter(
                self.labels()
                    .into_iter()
                    .map(|(key, value)| (key, serde_json::Value::String(value))),
            );
            vec![Patch::add(PATH_TO_LABELS, labels)]
        }
    }
}

/// JSON pointer to a single label
pub fn label_path(key: &str) -> String {
    format!("{PATH_TO_LABELS}/{key}")
}

pub fn bool_label(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Replace patch for a boolean label
pub fn bool_label_patch(key: &str, value: bool) -> Patch {
    Patch::replace(label_path(key), bool_label(value))
}
