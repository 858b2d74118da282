//! Mock Kubernetes API server
//!
//! A lightweight Axum-based HTTP server serving a single pod at
//! `/api/v1/namespaces/{namespace}/pods/{pod}`. PATCH bodies are applied to
//! the stored pod as JSON-Patch documents, every request is recorded, and
//! statuses can be scripted per method to simulate an unhealthy API server.

#![allow(dead_code, reason = "Shared by several test binaries")]

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use k8s_service_registration::{Config, KubeClient};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// One request as seen by the server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub accept: Option<String>,
    pub body: Option<Value>,
}

#[derive(Debug, Default)]
struct MockState {
    namespace: String,
    pod_name: String,
    pod: Value,
    /// Responses answered instead of serving, consumed one per request
    scripted: HashMap<Method, VecDeque<(StatusCode, String)>>,
    /// Rejects every request, writing a fresh token to the file each time
    rotating_rejection: Option<RotatingRejection>,
    /// Only this bearer token is accepted when set
    accepted_token: Option<String>,
    requests: Vec<RecordedRequest>,
}

#[derive(Debug)]
struct RotatingRejection {
    status: StatusCode,
    token_file: PathBuf,
    rejected: usize,
}

type SharedState = Arc<Mutex<MockState>>;

#[derive(Debug, Clone)]
pub struct MockApiServer {
    addr: SocketAddr,
    state: SharedState,
}

impl MockApiServer {
    /// Start serving `pod` on an ephemeral port
    pub async fn start(namespace: &str, pod_name: &str, pod: Value) -> Self {
        let state = Arc::new(Mutex::new(MockState {
            namespace: namespace.to_string(),
            pod_name: pod_name.to_string(),
            pod,
            ..MockState::default()
        }));

        let app = Router::new()
            .route(
                "/api/v1/namespaces/{namespace}/pods/{pod}",
                get(get_pod).patch(patch_pod),
            )
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock API server");
        let addr = listener
            .local_addr()
            .expect("Mock API server has no local address");
        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Mock API server failed");
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Answer the next `method` request with `status`
    pub fn push_status(&self, method: Method, status: StatusCode) {
        self.push_response(method, status, "scripted failure");
    }

    /// Answer the next `method` request with `status` and `message` in the body
    pub fn push_response(&self, method: Method, status: StatusCode, message: &str) {
        self.state
            .lock()
            .unwrap()
            .scripted
            .entry(method)
            .or_default()
            .push_back((status, message.to_string()));
    }

    /// Reject every request with `status`, rotating the token in `token_file`
    /// before each answer so the client always finds a new one
    ///
    /// The n-th rejection carries the message `rejected-{n}`.
    pub fn reject_with_rotating_token(&self, status: StatusCode, token_file: PathBuf) {
        self.state.lock().unwrap().rotating_rejection = Some(RotatingRejection {
            status,
            token_file,
            rejected: 0,
        });
    }

    /// Reject every bearer token except `token` with 401
    pub fn accept_only_token(&self, token: &str) {
        self.state.lock().unwrap().accepted_token = Some(token.to_string());
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn requests_with(&self, method: &Method) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == *method)
            .collect()
    }

    pub fn pod(&self) -> Value {
        self.state.lock().unwrap().pod.clone()
    }

    pub fn labels(&self) -> Value {
        self.pod()["metadata"]["labels"].clone()
    }
}

async fn get_pod(
    State(state): State<SharedState>,
    Path((namespace, pod)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    handle(&state, Method::GET, &namespace, &pod, &headers, None)
}

async fn patch_pod(
    State(state): State<SharedState>,
    Path((namespace, pod)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle(&state, Method::PATCH, &namespace, &pod, &headers, Some(body))
}

fn handle(
    state: &SharedState,
    method: Method,
    namespace: &str,
    pod_name: &str,
    headers: &HeaderMap,
    body: Option<Bytes>,
) -> Response {
    let mut state = state.lock().unwrap();

    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let body = body
        .filter(|b| !b.is_empty())
        .map(|b| serde_json::from_slice::<Value>(&b).unwrap_or_else(|_| json!(null)));
    state.requests.push(RecordedRequest {
        method: method.clone(),
        path: format!("/api/v1/namespaces/{namespace}/pods/{pod_name}"),
        authorization: header_value(header::AUTHORIZATION),
        content_type: header_value(header::CONTENT_TYPE),
        accept: header_value(header::ACCEPT),
        body: body.clone(),
    });

    if let Some(rejection) = state.rotating_rejection.as_mut() {
        rejection.rejected += 1;
        let n = rejection.rejected;
        std::fs::write(&rejection.token_file, format!("rotated-{n}"))
            .expect("Failed to rotate token file");
        return status_response(rejection.status, &format!("rejected-{n}"));
    }

    if let Some((status, message)) = state
        .scripted
        .get_mut(&method)
        .and_then(VecDeque::pop_front)
    {
        return status_response(status, &message);
    }

    if let Some(token) = &state.accepted_token {
        let expected = format!("Bearer {token}");
        if header_value(header::AUTHORIZATION).as_deref() != Some(expected.as_str()) {
            return status_response(StatusCode::UNAUTHORIZED, "Unauthorized");
        }
    }

    if namespace != state.namespace || pod_name != state.pod_name {
        return status_response(
            StatusCode::NOT_FOUND,
            &format!("pods \"{pod_name}\" not found"),
        );
    }

    if method == Method::PATCH {
        let mut patched = state.pod.clone();
        if let Err(message) = apply_json_patch(&mut patched, body.as_ref()) {
            return status_response(StatusCode::UNPROCESSABLE_ENTITY, &message);
        }
        state.pod = patched;
    }

    Json(state.pod.clone()).into_response()
}

fn status_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({
            "kind": "Status",
            "apiVersion": "v1",
            "status": "Failure",
            "message": message,
            "code": status.as_u16(),
        })),
    )
        .into_response()
}

/// Apply the `add` and `replace` operations of an RFC 6902 document
fn apply_json_patch(doc: &mut Value, patch: Option<&Value>) -> Result<(), String> {
    let ops = patch
        .and_then(Value::as_array)
        .ok_or_else(|| "patch body must be a JSON array".to_string())?;

    for op in ops {
        let kind = op["op"].as_str().ok_or("missing op")?;
        let path = op["path"].as_str().ok_or("missing path")?;
        let value = op.get("value").cloned().ok_or("missing value")?;

        let (parent, key) = path.rsplit_once('/').ok_or("invalid path")?;
        let key = key.replace("~1", "/").replace("~0", "~");
        let target = doc
            .pointer_mut(parent)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| format!("doc is missing path: \"{path}\""))?;

        match kind {
            "add" => {
                target.insert(key, value);
            }
            "replace" => {
                let slot = target
                    .get_mut(&key)
                    .ok_or_else(|| format!("doc is missing key: \"{path}\""))?;
                *slot = value;
            }
            other => return Err(format!("unsupported operation: {other}")),
        }
    }
    Ok(())
}

/// Pod JSON as returned by the API server
pub fn pod_json(namespace: &str, pod_name: &str, labels: Option<Value>) -> Value {
    let mut metadata = json!({
        "name": pod_name,
        "namespace": namespace,
        "uid": "5f8e6c2a-0000-4000-8000-000000000001",
    });
    if let Some(labels) = labels {
        metadata["labels"] = labels;
    }
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": metadata,
        "spec": { "containers": [{ "name": "vault", "image": "vault:1.15.2" }] },
    })
}

/// Token file holding `token`
pub fn token_file(token: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("Failed to create token file");
    std::fs::write(file.path(), token).expect("Failed to write token file");
    file
}

/// Client for the mock server authenticating with the token in `token_file`
pub fn client_for(server: &MockApiServer, token_file: &NamedTempFile) -> KubeClient {
    let bearer_token = std::fs::read_to_string(token_file.path())
        .expect("Failed to read token file")
        .trim()
        .to_string();
    let config = Config {
        host: server.url(),
        bearer_token,
        bearer_token_file: token_file.path().to_path_buf(),
        ca_certs: Vec::new(),
    };
    KubeClient::new(config).expect("Failed to build client")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
