//! # Registration Errors

use crate::client::ClientError;
use crate::config::ConfigError;
use thiserror::Error;

/// Error surfaced while starting the service registration
///
/// Runtime notification failures never surface; the retry handler owns them.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] ClientError),

    /// The pod came back without metadata, so it cannot carry labels
    #[error("no pod metadata on {namespace}/{pod_name}")]
    MissingMetadata { namespace: String, pod_name: String },
}

impl RegistrationError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Client(ClientError::NotFound))
    }
}
