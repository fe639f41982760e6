//! REST client for the platform API

use super::types::*;
use super::PlatformClient;
use crate::config::PlatformConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Platform client over HTTP
pub struct HttpPlatformClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpPlatformClient {
    /// Create a new client from configuration
    pub fn new(config: &PlatformConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }

    /// Send a request and decode the platform envelope.
    ///
    /// Non-2xx responses carrying an envelope are business-level failures;
    /// anything else unreadable is a transport error.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<ApiResponse<T>> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| Error::Platform(format!("request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Platform(format!("failed to read response: {}", e)))?;

        match serde_json::from_str::<ApiResponse<T>>(&body) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => Err(Error::Platform(format!(
                "platform returned HTTP {}: {}",
                status.as_u16(),
                body
            ))),
            Err(e) => Err(Error::Platform(format!("invalid platform response: {}", e))),
        }
    }
}

#[async_trait]
impl PlatformClient for HttpPlatformClient {
    async fn create_swarm(&self, spec: &SwarmSpec) -> Result<ApiResponse<Swarm>> {
        let request = self.client.post(self.url("/api/swarms")).json(spec);
        self.execute(request).await
    }

    async fn destroy_swarm(&self, swarm_id: &str, force: bool) -> Result<ApiResponse<()>> {
        let request = self
            .client
            .delete(self.url(&format!("/api/swarms/{}?force={}", swarm_id, force)));
        self.execute(request).await
    }

    async fn spawn_agent(&self, spec: &AgentSpec) -> Result<ApiResponse<Agent>> {
        let request = self.client.post(self.url("/api/agents")).json(spec);
        self.execute(request).await
    }

    async fn kill_agent(&self, agent_id: &str, force: bool) -> Result<ApiResponse<()>> {
        let request = self
            .client
            .post(self.url(&format!("/api/agents/{}/kill?force={}", agent_id, force)));
        self.execute(request).await
    }

    async fn get_agent(&self, agent_id: &str) -> Result<ApiResponse<Agent>> {
        let request = self.client.get(self.url(&format!("/api/agents/{}", agent_id)));
        self.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn client_for(server: &mockito::ServerGuard, api_key: Option<&str>) -> HttpPlatformClient {
        HttpPlatformClient::new(&PlatformConfig {
            base_url: server.url(),
            api_key: api_key.map(str::to_string),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_swarm_sends_spec() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/swarms")
            .match_header("authorization", "Bearer platform-key")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "strategy": "parallel",
                "initialAgents": 1,
                "maxAgents": 1
            })))
            .with_status(200)
            .with_body(r#"{"success":true,"data":{"id":"swarm-1","name":"openclaw-sess-1"}}"#)
            .create_async()
            .await;

        let client = client_for(&server, Some("platform-key"));
        let resp = client
            .create_swarm(&SwarmSpec {
                name: "openclaw-sess-1".to_string(),
                strategy: SwarmStrategy::Parallel,
                initial_agents: 1,
                max_agents: 1,
                config: HashMap::new(),
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(resp.success);
        assert_eq!(resp.data.unwrap().id, "swarm-1");
    }

    #[tokio::test]
    async fn test_business_failure_is_ok_envelope() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "POST",
                mockito::Matcher::Regex(r"^/api/agents/agent-9/kill".to_string()),
            )
            .with_status(404)
            .with_body(r#"{"success":false,"error":{"code":"NOT_FOUND","message":"no such agent"}}"#)
            .create_async()
            .await;

        let client = client_for(&server, None);
        let resp = client.kill_agent("agent-9", false).await.unwrap();
        assert!(!resp.success);
        assert_eq!(resp.error_details(), "NOT_FOUND: no such agent");
    }

    #[tokio::test]
    async fn test_unreadable_error_is_transport_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/agents/agent-1")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client = client_for(&server, None);
        let err = client.get_agent("agent-1").await.unwrap_err();
        assert!(matches!(err, Error::Platform(_)));
        assert!(err.to_string().contains("502"));
    }
}
