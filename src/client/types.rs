//! # Pod API Types
//!
//! JSON-Patch operations sent to the API server and the slice of the pod
//! object we read back.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// JSON-Patch operation
///
/// The numeric values are stable and may be persisted: new operations are
/// appended, never reordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PatchOperation {
    /// Never sent; the client rejects patches still carrying it
    #[default]
    Unset = 0,
    Add = 1,
    Replace = 2,
}

impl PatchOperation {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unset),
            1 => Some(Self::Add),
            2 => Some(Self::Replace),
            _ => None,
        }
    }

    /// RFC 6902 `op` value, `None` for [`PatchOperation::Unset`]
    pub fn as_str(self) -> Option<&'static str> {
        match self {
            Self::Unset => None,
            Self::Add => Some("add"),
            Self::Replace => Some("replace"),
        }
    }
}

/// A single JSON-Patch operation against the pod
///
/// `path` is the identity of a patch: a newer patch on the same path
/// supersedes an older one.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub operation: PatchOperation,
    pub path: String,
    pub value: serde_json::Value,
}

impl Patch {
    pub fn add(path: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            operation: PatchOperation::Add,
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn replace(path: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            operation: PatchOperation::Replace,
            path: path.into(),
            value: value.into(),
        }
    }
}

/// Wire form of a [`Patch`], built only after the operation is validated
#[derive(Debug, Serialize)]
pub(crate) struct JsonPatchOp<'a> {
    pub op: &'static str,
    pub path: &'a str,
    pub value: &'a serde_json::Value,
}

/// The parts of a pod we consume
///
/// A missing `metadata` is a configuration problem; `metadata.labels` being
/// `None` means the labels field does not exist yet (distinct from empty).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Pod {
    #[serde(default)]
    pub metadata: Option<ObjectMeta>,
}

impl Pod {
    pub fn name(&self) -> Option<&str> {
        self.metadata.as_ref()?.name.as_deref()
    }

    pub fn labels(&self) -> Option<&BTreeMap<String, String>> {
        self.metadata.as_ref()?.labels.as_ref()
    }
}
