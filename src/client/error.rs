//! # Client Errors
//!
//! Error taxonomy for calls against the pod resource, with classification of
//! transient vs permanent failures.

use crate::config::ConfigError;
use thiserror::Error;

/// Error returned by [`PodApi`](super::PodApi) operations
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("\"namespace\" is unset")]
    NamespaceUnset,

    #[error("\"podName\" is unset")]
    PodNameUnset,

    #[error("patch operation must be set (path {path})")]
    UnsetPatchOperation { path: String },

    /// The API server answered 404
    #[error("not found")]
    NotFound,

    /// 401/403 persisted: the token on disk was unchanged or attempts ran out.
    /// `context` describes the most recent rejected request.
    #[error("authentication failed after {attempts} attempt(s): {context}")]
    AuthRefreshExhausted { attempts: usize, context: String },

    #[error("unexpected status code {status}: {context}")]
    UnexpectedStatus { status: u16, context: String },

    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    /// No HTTP response at all
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to reload bearer token: {0}")]
    TokenReload(#[from] ConfigError),
}

impl ClientError {
    /// Whether a later attempt may succeed without any configuration change
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::UnexpectedStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Error category for metrics and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NamespaceUnset | Self::PodNameUnset | Self::UnsetPatchOperation { .. } => {
                "validation"
            }
            Self::NotFound => "not_found",
            Self::AuthRefreshExhausted { .. } => "auth",
            Self::UnexpectedStatus { .. } => "status",
            Self::Build(_) => "build",
            Self::Transport(_) => "transport",
            Self::Decode(_) | Self::Encode(_) => "codec",
            Self::TokenReload(_) => "token_reload",
        }
    }
}
