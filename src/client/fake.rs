//! In-memory [`PodApi`] for unit tests.

use super::{ClientError, Patch, PodApi, Pod};
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct FakeState {
    pod: Pod,
    fail_gets: bool,
    fail_patches: bool,
    get_calls: usize,
    /// Every patch_pod call, including the failed ones
    patch_calls: Vec<Vec<Patch>>,
}

#[derive(Debug, Default)]
pub(crate) struct FakePodApi {
    state: Mutex<FakeState>,
}

impl FakePodApi {
    pub(crate) fn with_pod(pod: Pod) -> Self {
        Self {
            state: Mutex::new(FakeState {
                pod,
                ..FakeState::default()
            }),
        }
    }

    pub(crate) fn set_fail_gets(&self, fail: bool) {
        self.state.lock().unwrap().fail_gets = fail;
    }

    pub(crate) fn set_fail_patches(&self, fail: bool) {
        self.state.lock().unwrap().fail_patches = fail;
    }

    pub(crate) fn get_calls(&self) -> usize {
        self.state.lock().unwrap().get_calls
    }

    pub(crate) fn patch_calls(&self) -> Vec<Vec<Patch>> {
        self.state.lock().unwrap().patch_calls.clone()
    }
}

fn server_error() -> ClientError {
    ClientError::UnexpectedStatus {
        status: 500,
        context: "fake server error".to_string(),
    }
}

#[async_trait]
impl PodApi for FakePodApi {
    async fn get_pod(&self, _namespace: &str, _pod_name: &str) -> Result<Pod, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.get_calls += 1;
        if state.fail_gets {
            return Err(server_error());
        }
        Ok(state.pod.clone())
    }

    async fn patch_pod(
        &self,
        _namespace: &str,
        _pod_name: &str,
        patches: &[Patch],
    ) -> Result<(), ClientError> {
        if patches.is_empty() {
            return Ok(());
        }
        let mut state = self.state.lock().unwrap();
        state.patch_calls.push(patches.to_vec());
        if state.fail_patches {
            return Err(server_error());
        }
        Ok(())
    }
}
