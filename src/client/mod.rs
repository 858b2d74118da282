//! # Pod API Client
//!
//! Minimal typed client for the single pod resource
//! `/api/v1/namespaces/{namespace}/pods/{pod}`.
//!
//! Uses reqwest with rustls and the cluster CA bundle. Every request carries
//! the service account bearer token; when the API server answers 401/403 the
//! token file is re-read and the request replayed with the same body, up to
//! [`MAX_REQUEST_ATTEMPTS`] times. Transport errors and every other status are
//! returned to the caller immediately; retrying those is the retry handler's job.

mod error;
#[cfg(test)]
pub(crate) mod fake;
mod types;

pub use error::ClientError;
pub use types::{Patch, PatchOperation, Pod};

use crate::config::Config;
use crate::constants::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, JSON_PATCH_CONTENT_TYPE,
    MAX_ERROR_BODY_BYTES, MAX_REQUEST_ATTEMPTS, POD_ENDPOINT_PREFIX,
};
use crate::observability::metrics;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, debug_span, warn, Instrument};
use types::JsonPatchOp;

/// Operations the service registration needs from the API server
#[async_trait]
pub trait PodApi: Send + Sync + std::fmt::Debug {
    /// Fetch the pod
    async fn get_pod(&self, namespace: &str, pod_name: &str) -> Result<Pod, ClientError>;

    /// Apply `patches` to the pod as one JSON-Patch document
    ///
    /// An empty patch list succeeds without a request.
    async fn patch_pod(
        &self,
        namespace: &str,
        pod_name: &str,
        patches: &[Patch],
    ) -> Result<(), ClientError>;
}

/// HTTPS client for the pod resource
pub struct KubeClient {
    http: reqwest::Client,
    /// Swapped when a refreshed token is found on disk
    config: RwLock<Config>,
}

impl std::fmt::Debug for KubeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClient").finish_non_exhaustive()
    }
}

impl KubeClient {
    /// Create a client trusting the CA bundle from `config`
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self, ClientError> {
        // Required for rustls 0.23+ when no default provider is set via features
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            debug!("rustls crypto provider already installed");
        }

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS));
        for cert in &config.ca_certs {
            builder = builder.add_root_certificate(cert.clone());
        }
        let http = builder.build().map_err(ClientError::Build)?;

        Ok(Self {
            http,
            config: RwLock::new(config),
        })
    }

    /// Snapshot of the current configuration (reflects token refreshes)
    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }

    /// Send a request, replaying it with a refreshed token on 401/403
    ///
    /// Returns the response only for 200/201/202; the caller owns its body.
    async fn execute(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Response, ClientError> {
        let mut last_auth_context = String::new();

        for attempt in 1..=MAX_REQUEST_ATTEMPTS {
            let (host, token) = {
                let config = self.config.read().await;
                (config.host.clone(), config.bearer_token.clone())
            };
            let url = format!("{host}{endpoint}");

            let mut request = self
                .http
                .request(method.clone(), &url)
                .bearer_auth(&token)
                .header(ACCEPT, "application/json");
            if let Some(body) = &body {
                request = request
                    .header(CONTENT_TYPE, JSON_PATCH_CONTENT_TYPE)
                    .body(body.clone());
            }

            let span = debug_span!("k8s.pod.request", http.method = %method, http.url = %url, attempt);
            let response = match request.send().instrument(span).await {
                Ok(response) => response,
                Err(e) => {
                    metrics::increment_requests(method.as_str(), "transport_error");
                    return Err(ClientError::Transport(e));
                }
            };

            let status = response.status();
            match status {
                StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED => {
                    metrics::increment_requests(method.as_str(), "success");
                    debug!(http.method = %method, http.url = %url, status = status.as_u16(), "Request succeeded");
                    return Ok(response);
                }
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    metrics::increment_requests(method.as_str(), "unauthorized");
                    let context =
                        sanitized_context(&method, &url, body.as_deref(), status, response).await;
                    if !self.refresh_token(&token).await? {
                        return Err(ClientError::AuthRefreshExhausted {
                            attempts: attempt,
                            context,
                        });
                    }
                    warn!(
                        status = status.as_u16(),
                        attempt, "Request rejected, retrying with refreshed bearer token"
                    );
                    last_auth_context = context;
                }
                StatusCode::NOT_FOUND => {
                    metrics::increment_requests(method.as_str(), "not_found");
                    close_body(response).await;
                    return Err(ClientError::NotFound);
                }
                _ => {
                    metrics::increment_requests(method.as_str(), "unexpected_status");
                    let context =
                        sanitized_context(&method, &url, body.as_deref(), status, response).await;
                    return Err(ClientError::UnexpectedStatus {
                        status: status.as_u16(),
                        context,
                    });
                }
            }
        }

        Err(ClientError::AuthRefreshExhausted {
            attempts: MAX_REQUEST_ATTEMPTS,
            context: last_auth_context,
        })
    }

    /// Re-read the token file after `rejected_token` was refused
    ///
    /// Returns `false` when the file still holds the rejected token.
    async fn refresh_token(&self, rejected_token: &str) -> Result<bool, ClientError> {
        let mut config = self.config.write().await;
        if config.bearer_token != rejected_token {
            // Another request already swapped in a newer token
            return Ok(true);
        }

        let fresh = config.reload_token()?;
        if fresh.bearer_token == config.bearer_token {
            return Ok(false);
        }

        debug!(
            token_file = %config.bearer_token_file.display(),
            "Bearer token rotated on disk"
        );
        *config = fresh;
        metrics::increment_token_refreshes();
        Ok(true)
    }
}

#[async_trait]
impl PodApi for KubeClient {
    async fn get_pod(&self, namespace: &str, pod_name: &str) -> Result<Pod, ClientError> {
        let endpoint = pod_endpoint(namespace, pod_name)?;
        let response = self.execute(Method::GET, &endpoint, None).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(ClientError::Decode)
    }

    async fn patch_pod(
        &self,
        namespace: &str,
        pod_name: &str,
        patches: &[Patch],
    ) -> Result<(), ClientError> {
        let endpoint = pod_endpoint(namespace, pod_name)?;
        if patches.is_empty() {
            return Ok(());
        }

        let body = encode_patches(patches)?;
        let response = self.execute(Method::PATCH, &endpoint, Some(body)).await?;
        close_body(response).await;
        Ok(())
    }
}

fn pod_endpoint(namespace: &str, pod_name: &str) -> Result<String, ClientError> {
    if namespace.is_empty() {
        return Err(ClientError::NamespaceUnset);
    }
    if pod_name.is_empty() {
        return Err(ClientError::PodNameUnset);
    }
    Ok(format!("{POD_ENDPOINT_PREFIX}/{namespace}/pods/{pod_name}"))
}

fn encode_patches(patches: &[Patch]) -> Result<Vec<u8>, ClientError> {
    let ops = patches
        .iter()
        .map(|patch| {
            let op = patch
                .operation
                .as_str()
                .ok_or_else(|| ClientError::UnsetPatchOperation {
                    path: patch.path.clone(),
                })?;
            Ok(JsonPatchOp {
                op,
                path: &patch.path,
                value: &patch.value,
            })
        })
        .collect::<Result<Vec<_>, ClientError>>()?;
    serde_json::to_vec(&ops).map_err(ClientError::Encode)
}

/// Describe a failed exchange for error messages
///
/// Never includes headers: some API server error paths echo `Authorization`.
async fn sanitized_context(
    method: &Method,
    url: &str,
    request_body: Option<&[u8]>,
    status: StatusCode,
    response: Response,
) -> String {
    let request_body = request_body.map(String::from_utf8_lossy).unwrap_or_default();
    let response_body = read_bounded_body(response).await;
    format!(
        "req method: {method}, req url: {url}, req body: {request_body}, resp statuscode: {}, resp body: {response_body}",
        status.as_u16()
    )
}

/// Read at most [`MAX_ERROR_BODY_BYTES`] of the body
async fn read_bounded_body(mut response: Response) -> String {
    let mut buf: Vec<u8> = Vec::new();
    let mut truncated = false;
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let room = MAX_ERROR_BODY_BYTES - buf.len();
                if chunk.len() > room {
                    buf.extend_from_slice(&chunk[..room]);
                    truncated = true;
                    break;
                }
                buf.extend_from_slice(&chunk);
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read response body");
                break;
            }
        }
    }

    let mut body = String::from_utf8_lossy(&buf).into_owned();
    if truncated {
        body.push_str("...(truncated)");
    }
    body
}

async fn close_body(response: Response) {
    if let Err(e) = response.bytes().await {
        warn!(error = %e, "Failed to close response body");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pod_endpoint() {
        assert_eq!(
            pod_endpoint("vault", "vault-0").unwrap(),
            "/api/v1/namespaces/vault/pods/vault-0"
        );
        assert!(matches!(
            pod_endpoint("", "vault-0"),
            Err(ClientError::NamespaceUnset)
        ));
        assert!(matches!(
            pod_endpoint("vault", ""),
            Err(ClientError::PodNameUnset)
        ));
    }

    #[test]
    fn test_encode_patches() {
        let patches = vec![
            Patch::add("/metadata/labels", json!({"a": "b"})),
            Patch::replace("/metadata/labels/a", "c"),
        ];
        let body: serde_json::Value =
            serde_json::from_slice(&encode_patches(&patches).unwrap()).unwrap();
        assert_eq!(
            body,
            json!([
                {"op": "add", "path": "/metadata/labels", "value": {"a": "b"}},
                {"op": "replace", "path": "/metadata/labels/a", "value": "c"}
            ])
        );
    }

    #[test]
    fn test_encode_rejects_unset_operation() {
        let patches = vec![
            Patch::replace("/metadata/labels/a", "c"),
            Patch {
                operation: PatchOperation::Unset,
                path: "/metadata/labels/b".to_string(),
                value: json!("d"),
            },
        ];
        match encode_patches(&patches) {
            Err(ClientError::UnsetPatchOperation { path }) => {
                assert_eq!(path, "/metadata/labels/b");
            }
            other => panic!("Expected UnsetPatchOperation, got {other:?}"),
        }
    }
}
