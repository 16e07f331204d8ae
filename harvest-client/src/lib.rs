//! Agent platform HTTP client
//!
//! A small, type-safe client for the hosted agent platform's v2 API:
//! launching an agent and fetching the output of the container it
//! runs in. Authentication is a static key header on every request,
//! with an optional session cookie for accounts that require it.
//!
//! # Example
//!
//! ```no_run
//! use harvest_client::AgentClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), harvest_client::ClientError> {
//!     let client = AgentClient::new("https://api.example.com", "my-api-key");
//!
//!     let launch = client.launch_agent("1234").await?;
//!     println!("container: {:?}", launch.container_id);
//!     Ok(())
//! }
//! ```

mod agents;
pub mod error;

pub use agents::LaunchResponse;
pub use error::{ClientError, Result};

use async_trait::async_trait;
use harvest_core::RawOutput;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

/// Header carrying the platform API key.
const API_KEY_HEADER: &str = "X-Api-Key";

/// Operations the launcher and poller need from the platform.
///
/// Implemented by [`AgentClient`]; tests substitute scripted
/// implementations.
#[async_trait]
pub trait AgentApi: Send + Sync {
    /// Start one run of the given agent.
    async fn launch_agent(&self, agent_id: &str) -> Result<LaunchResponse>;

    /// Fetch the current output document for a running container.
    async fn fetch_output(&self, container_id: &str) -> Result<RawOutput>;
}

/// HTTP client for the agent platform API
#[derive(Debug, Clone)]
pub struct AgentClient {
    /// Base URL of the platform API (e.g. "https://api.example.com")
    base_url: String,
    /// Static API key sent on every request
    api_key: String,
    /// Optional session cookie for session-authenticated accounts
    session_cookie: Option<String>,
    /// HTTP client instance
    client: Client,
}

impl AgentClient {
    /// Create a new client for the given API base URL and key.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(base_url, api_key, Client::new())
    }

    /// Create a client with a custom reqwest `Client`, allowing
    /// timeouts, proxies, and TLS settings to be configured.
    pub fn with_client(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        client: Client,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            session_cookie: None,
            client,
        }
    }

    /// Attach a session cookie to every request.
    pub fn with_session_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.session_cookie = Some(cookie.into());
        self
    }

    /// Get the base URL of the platform API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Apply the auth headers to an outgoing request.
    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        let req = req.header(API_KEY_HEADER, &self.api_key);
        match &self.session_cookie {
            Some(cookie) => req.header(reqwest::header::COOKIE, cookie),
            None => req,
        }
    }

    /// Handle an API response and deserialize JSON
    ///
    /// Checks the status code and returns an appropriate error if the
    /// request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = AgentClient::new("https://api.example.com", "key");
        assert_eq!(client.base_url(), "https://api.example.com");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = AgentClient::new("https://api.example.com/", "key");
        assert_eq!(client.base_url(), "https://api.example.com");
    }

    #[test]
    fn test_session_cookie_is_optional() {
        let client = AgentClient::new("https://api.example.com", "key");
        assert!(client.session_cookie.is_none());

        let client = client.with_session_cookie("session=abc");
        assert_eq!(client.session_cookie.as_deref(), Some("session=abc"));
    }
}
