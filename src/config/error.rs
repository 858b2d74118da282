//! # Configuration Errors
//!
//! Failures while loading in-cluster credentials or resolving the pod coordinates.

use std::path::PathBuf;
use thiserror::Error;

/// Error raised while building a [`Config`](super::Config) or a
/// [`RegistrationConfig`](super::RegistrationConfig)
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The API service host or port is not set, so we are not running in a pod
    #[error(
        "unable to load in-cluster configuration, KUBERNETES_SERVICE_HOST and KUBERNETES_SERVICE_PORT must be defined"
    )]
    NotInCluster,

    /// The service account token could not be read
    #[error("failed to read bearer token from {path}: {source}")]
    ReadToken {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CA bundle could not be read
    #[error("failed to read CA bundle from {path}: {source}")]
    ReadCa {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CA bundle is not valid PEM
    #[error("failed to parse CA bundle {path}: {source}")]
    InvalidCa {
        path: PathBuf,
        #[source]
        source: reqwest::Error,
    },

    /// The CA bundle holds no certificates
    #[error("CA bundle {path} contains no certificates")]
    EmptyCa { path: PathBuf },

    /// Neither the environment variable nor the config key is set
    #[error("one of {env_var} or {config_key} must be set")]
    MissingField {
        env_var: &'static str,
        config_key: &'static str,
    },
}
