//! Wire types for the platform API
//!
//! All types use camelCase JSON serialization to match the platform REST API.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Response envelope returned by every platform operation.
///
/// `success == false` is a business-level refusal (quota, unknown id, ...);
/// transport failures surface as `Err` from the client instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorBody>,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying `data`
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Business-level failure
    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiErrorBody {
                code: code.into(),
                message: message.into(),
            }),
        }
    }

    /// Human-readable description of the failure
    pub fn error_details(&self) -> String {
        match &self.error {
            Some(err) => format!("{}: {}", err.code, err.message),
            None => "platform reported failure without details".to_string(),
        }
    }
}

impl ApiResponse<()> {
    /// Successful response without payload
    pub fn done() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }
}

/// Error payload inside a failed [`ApiResponse`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

/// Swarm scheduling strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwarmStrategy {
    Parallel,
    Pipeline,
    Map,
    Tree,
}

/// Request body for creating a swarm
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwarmSpec {
    pub name: String,
    pub strategy: SwarmStrategy,
    pub initial_agents: u32,
    pub max_agents: u32,
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

/// A swarm as reported by the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Swarm {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: String,
}

/// Request body for spawning an agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSpec {
    pub swarm_id: String,
    pub agent_type: String,
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

/// Agent lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Pending,
    Spawning,
    Idle,
    Running,
    Paused,
    Completed,
    Failed,
    Killed,
    #[serde(other)]
    Unknown,
}

impl AgentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Spawning => "spawning",
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Killed => "killed",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An agent as reported by the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    #[serde(default)]
    pub swarm_id: Option<String>,
    pub status: AgentState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_ms: Option<u64>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Agent {
    /// Progress from the dedicated field, falling back to `metadata.progress`
    pub fn effective_progress(&self) -> Option<f64> {
        self.progress
            .or_else(|| self.metadata.get("progress").and_then(|v| v.as_f64()))
    }

    /// Result from the dedicated field, falling back to `metadata.result`
    pub fn effective_result(&self) -> Option<serde_json::Value> {
        self.result
            .clone()
            .or_else(|| self.metadata.get("result").cloned())
    }
}
