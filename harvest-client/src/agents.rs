//! Agent launch and output endpoints

use async_trait::async_trait;
use harvest_core::RawOutput;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::{AgentApi, AgentClient};

/// Request body for launching an agent
#[derive(Debug, Serialize)]
struct LaunchRequest<'a> {
    id: &'a str,
}

/// Response from the launch endpoint
///
/// `container_id` is the handle for all subsequent output fetches.
/// The platform has been observed to omit it on partially failed
/// launches, so it is optional here and validated by the launcher.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchResponse {
    #[serde(default)]
    pub container_id: Option<String>,
}

impl AgentClient {
    /// Launch one run of the given agent.
    ///
    /// `POST {base}/api/v2/agents/launch` with the agent id; returns
    /// the container handle for the run. Rate limiting surfaces as an
    /// API error with status 429 (see
    /// [`ClientError::is_rate_limited`](crate::ClientError::is_rate_limited)).
    pub async fn launch_agent(&self, agent_id: &str) -> Result<LaunchResponse> {
        let url = format!("{}/api/v2/agents/launch", self.base_url());
        debug!(agent_id, "launching agent");

        let response = self
            .authed(self.client.post(&url))
            .json(&LaunchRequest { id: agent_id })
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Fetch the current output document for a container.
    ///
    /// `GET {base}/api/v2/containers/fetch-output?id={container_id}`.
    /// The body is returned verbatim: the `output` field inside it is
    /// polymorphic (log string, array, object, or null while the run
    /// is still in progress) and is interpreted by the caller.
    pub async fn fetch_output(&self, container_id: &str) -> Result<RawOutput> {
        let url = format!(
            "{}/api/v2/containers/fetch-output?id={}",
            self.base_url(),
            container_id
        );
        debug!(container_id, "fetching container output");

        let response = self.authed(self.client.get(&url)).send().await?;

        self.handle_response(response).await
    }
}

#[async_trait]
impl AgentApi for AgentClient {
    async fn launch_agent(&self, agent_id: &str) -> Result<LaunchResponse> {
        AgentClient::launch_agent(self, agent_id).await
    }

    async fn fetch_output(&self, container_id: &str) -> Result<RawOutput> {
        AgentClient::fetch_output(self, container_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_response_tolerates_missing_container_id() {
        let resp: LaunchResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.container_id.is_none());

        let resp: LaunchResponse =
            serde_json::from_str(r#"{"containerId": "abc-123"}"#).unwrap();
        assert_eq!(resp.container_id.as_deref(), Some("abc-123"));
    }
}
