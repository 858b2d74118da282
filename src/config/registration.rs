//! # Registration Configuration
//!
//! Pod coordinates and retry cadence for the service registration.
//!
//! The namespace and pod name come from the daemon's `service_registration`
//! config map, and may be overridden by environment variables populated
//! through the downward API.

use super::error::ConfigError;
use crate::constants::{
    CONFIG_KEY_NAMESPACE, CONFIG_KEY_POD_NAME, DEFAULT_RETRY_INTERVAL_SECS, ENV_POD_NAME,
    ENV_POD_NAMESPACE,
};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Where to write labels and how often to retry failed writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationConfig {
    pub namespace: String,
    pub pod_name: String,
    /// Cadence of the background retry loop
    pub retry_interval: Duration,
}

impl RegistrationConfig {
    pub fn new(namespace: impl Into<String>, pod_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            pod_name: pod_name.into(),
            retry_interval: Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECS),
        }
    }

    /// Resolve the pod coordinates from the process environment and the config map
    ///
    /// # Errors
    /// `MissingField` when neither source provides a value.
    pub fn from_config_map(config: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::resolve(config, |key| std::env::var(key).ok())
    }

    /// Resolve the pod coordinates with an injectable environment lookup
    ///
    /// # Errors
    /// `MissingField` when neither source provides a value.
    pub fn resolve<F>(config: &HashMap<String, String>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let namespace = required_field(config, &env, ENV_POD_NAMESPACE, CONFIG_KEY_NAMESPACE)?;
        let pod_name = required_field(config, &env, ENV_POD_NAME, CONFIG_KEY_POD_NAME)?;
        Ok(Self::new(namespace, pod_name))
    }

    #[must_use]
    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }
}

fn required_field<F>(
    config: &HashMap<String, String>,
    env: &F,
    env_var: &'static str,
    config_key: &'static str,
) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = env(env_var).filter(|v| !v.is_empty()) {
        debug!("{} set to {} from environment ({})", config_key, value, env_var);
        return Ok(value);
    }
    if let Some(value) = config.get(config_key).filter(|v| !v.is_empty()) {
        debug!("{} set to {} from config", config_key, value);
        return Ok(value.clone());
    }
    Err(ConfigError::MissingField {
        env_var,
        config_key,
    })
}
