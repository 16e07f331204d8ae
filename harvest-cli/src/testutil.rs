//! Scripted test doubles for the agent API and object store

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use harvest_client::{AgentApi, ClientError, LaunchResponse, Result as ClientResult};
use harvest_core::RawOutput;

use crate::storage::{ObjectStore, StorageError};

/// Agent API double that replays scripted responses in order.
///
/// An exhausted script answers with a parse error, so a test that
/// makes more calls than it scripted fails loudly instead of hanging.
#[derive(Default)]
pub struct ScriptedAgent {
    launches: Mutex<VecDeque<ClientResult<LaunchResponse>>>,
    outputs: Mutex<VecDeque<ClientResult<RawOutput>>>,
    launch_calls: AtomicU32,
    fetch_calls: AtomicU32,
}

impl ScriptedAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launch_ok(self, container_id: &str) -> Self {
        self.push_launch(Ok(LaunchResponse {
            container_id: Some(container_id.to_string()),
        }))
    }

    pub fn launch_ok_without_id(self) -> Self {
        self.push_launch(Ok(LaunchResponse { container_id: None }))
    }

    pub fn launch_err(self, err: ClientError) -> Self {
        self.push_launch(Err(err))
    }

    pub fn output_ok(self, raw: RawOutput) -> Self {
        self.push_output(Ok(raw))
    }

    pub fn output_err(self, err: ClientError) -> Self {
        self.push_output(Err(err))
    }

    pub fn launch_calls(&self) -> u32 {
        self.launch_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    fn push_launch(self, response: ClientResult<LaunchResponse>) -> Self {
        self.launches.lock().unwrap().push_back(response);
        self
    }

    fn push_output(self, response: ClientResult<RawOutput>) -> Self {
        self.outputs.lock().unwrap().push_back(response);
        self
    }
}

#[async_trait]
impl AgentApi for ScriptedAgent {
    async fn launch_agent(&self, _agent_id: &str) -> ClientResult<LaunchResponse> {
        self.launch_calls.fetch_add(1, Ordering::SeqCst);
        self.launches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::ParseError("launch script exhausted".into())))
    }

    async fn fetch_output(&self, _container_id: &str) -> ClientResult<RawOutput> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.outputs
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::ParseError("output script exhausted".into())))
    }
}

/// In-memory object store recording every put.
#[derive(Default)]
pub struct MemoryStore {
    pub puts: Mutex<Vec<(String, Vec<u8>, String)>>,
    fail: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every put fails.
    pub fn failing() -> Self {
        Self {
            puts: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.puts
            .lock()
            .unwrap()
            .iter()
            .map(|(key, _, _)| key.clone())
            .collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        if self.fail {
            return Err(StorageError::Upload {
                key: key.to_string(),
                cause: "simulated outage".to_string(),
            });
        }
        self.puts
            .lock()
            .unwrap()
            .push((key.to_string(), bytes, content_type.to_string()));
        Ok(format!("s3://test-bucket/{}", key))
    }
}
