//! # In-Cluster Configuration
//!
//! Reads the service account token and CA bundle mounted into the pod and
//! builds the API server base URL from the Kubernetes service environment.
//!
//! No network calls happen here. The token file is re-read on authentication
//! failures because the kubelet rotates projected tokens in place.

use super::error::ConfigError;
use crate::constants::{
    DEFAULT_CA_FILE, DEFAULT_TOKEN_FILE, ENV_KUBERNETES_SERVICE_HOST,
    ENV_KUBERNETES_SERVICE_PORT, IN_CLUSTER_SCHEME,
};
use reqwest::Certificate;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Locations of the service account credentials
///
/// Defaults to the well-known mount points; tests point these at temp files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InClusterPaths {
    pub token_file: PathBuf,
    pub ca_file: PathBuf,
}

impl Default for InClusterPaths {
    fn default() -> Self {
        Self {
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
            ca_file: PathBuf::from(DEFAULT_CA_FILE),
        }
    }
}

/// Connection settings for the API server
#[derive(Clone)]
pub struct Config {
    /// Base URL, e.g. `https://10.96.0.1:443`
    pub host: String,
    pub bearer_token: String,
    /// Re-read when the API server rejects `bearer_token`
    pub bearer_token_file: PathBuf,
    /// Roots trusted for the API server's TLS certificate
    pub ca_certs: Vec<Certificate>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("bearer_token_file", &self.bearer_token_file)
            .field("ca_certs", &self.ca_certs.len())
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load the in-cluster configuration from the default mount points
    ///
    /// # Errors
    /// `NotInCluster` when the service environment is missing, or an I/O or
    /// parse error for the credential files.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&InClusterPaths::default())
    }

    /// Load the in-cluster configuration with overridden credential paths
    ///
    /// # Errors
    /// See [`Config::load`].
    pub fn load_from(paths: &InClusterPaths) -> Result<Self, ConfigError> {
        let host = std::env::var(ENV_KUBERNETES_SERVICE_HOST).unwrap_or_default();
        let port = std::env::var(ENV_KUBERNETES_SERVICE_PORT).unwrap_or_default();
        Self::from_parts(&host, &port, paths)
    }

    /// Build the configuration from an explicit host and port
    ///
    /// # Errors
    /// See [`Config::load`].
    pub fn from_parts(host: &str, port: &str, paths: &InClusterPaths) -> Result<Self, ConfigError> {
        if host.is_empty() || port.is_empty() {
            return Err(ConfigError::NotInCluster);
        }

        let bearer_token = read_token(&paths.token_file)?;
        let ca_certs = read_ca_bundle(&paths.ca_file)?;
        let host = format!("{IN_CLUSTER_SCHEME}://{}", join_host_port(host, port));

        debug!(
            host = %host,
            ca_certs = ca_certs.len(),
            "Loaded in-cluster configuration"
        );

        Ok(Self {
            host,
            bearer_token,
            bearer_token_file: paths.token_file.clone(),
            ca_certs,
        })
    }

    /// Fresh copy of this configuration with the token re-read from disk
    ///
    /// # Errors
    /// Returns `ReadToken` if the token file can no longer be read.
    pub fn reload_token(&self) -> Result<Self, ConfigError> {
        Ok(Self {
            bearer_token: read_token(&self.bearer_token_file)?,
            ..self.clone()
        })
    }
}

/// Join host and port, bracketing IPv6 literals
pub fn join_host_port(host: &str, port: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

fn read_token(path: &Path) -> Result<String, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadToken {
        path: path.to_path_buf(),
        source,
    })?;
    // A trailing newline is not a legal header value
    Ok(raw.trim().to_string())
}

fn read_ca_bundle(path: &Path) -> Result<Vec<Certificate>, ConfigError> {
    let pem = std::fs::read(path).map_err(|source| ConfigError::ReadCa {
        path: path.to_path_buf(),
        source,
    })?;
    let certs = Certificate::from_pem_bundle(&pem).map_err(|source| ConfigError::InvalidCa {
        path: path.to_path_buf(),
        source,
    })?;
    if certs.is_empty() {
        return Err(ConfigError::EmptyCa {
            path: path.to_path_buf(),
        });
    }
    Ok(certs)
}
