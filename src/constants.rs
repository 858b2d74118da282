//! # Constants
//!
//! Default values, environment variable names and well-known label keys.

/// Environment variable holding the host of the Kubernetes API service
pub const ENV_KUBERNETES_SERVICE_HOST: &str = "KUBERNETES_SERVICE_HOST";

/// Environment variable holding the port of the Kubernetes API service
pub const ENV_KUBERNETES_SERVICE_PORT: &str = "KUBERNETES_SERVICE_PORT";

/// Environment override for the namespace of the pod to label
pub const ENV_POD_NAMESPACE: &str = "VAULT_NAMESPACE";

/// Environment override for the name of the pod to label
pub const ENV_POD_NAME: &str = "VAULT_POD_NAME";

/// Config map key for the namespace of the pod to label
pub const CONFIG_KEY_NAMESPACE: &str = "namespace";

/// Config map key for the name of the pod to label
pub const CONFIG_KEY_POD_NAME: &str = "pod_name";

/// Service account token mounted into every pod
pub const DEFAULT_TOKEN_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// CA bundle for the API server, mounted next to the token
pub const DEFAULT_CA_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

/// Scheme used to reach the API server from inside the cluster
pub const IN_CLUSTER_SCHEME: &str = "https";

/// Resource path of a single pod
/// Format: /api/v1/namespaces/{namespace}/pods/{pod}
pub const POD_ENDPOINT_PREFIX: &str = "/api/v1/namespaces";

/// Content type for RFC 6902 JSON-Patch bodies
pub const JSON_PATCH_CONTENT_TYPE: &str = "application/json-patch+json";

/// Upper bound on attempts per request (only token refreshes consume attempts)
pub const MAX_REQUEST_ATTEMPTS: usize = 10;

/// Response bodies quoted in error context are cut at this many bytes
pub const MAX_ERROR_BODY_BYTES: usize = 4096;

/// Default request timeout for calls to the API server (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default connect timeout for calls to the API server (seconds)
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// How often the retry handler flushes pending patches (seconds)
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 5;

/// JSON pointer to the labels map of a pod
pub const PATH_TO_LABELS: &str = "/metadata/labels";

/// Label carrying the daemon's semantic version
pub const LABEL_VERSION: &str = "vault-version";

/// Label set to "true" on the active node
pub const LABEL_ACTIVE: &str = "vault-ha-active";

/// Label set to "true" while the daemon is sealed
pub const LABEL_SEALED: &str = "vault-ha-sealed";

/// Label set to "true" on performance standby nodes
pub const LABEL_PERF_STANDBY: &str = "vault-ha-perf-standby";

/// Label set to "true" once the daemon has been initialized
pub const LABEL_INITIALIZED: &str = "vault-ha-initialized";
