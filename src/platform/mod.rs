//! Platform API client interface
//!
//! The bridge never runs agents itself; it drives the platform through
//! [`PlatformClient`]. Two implementations ship with the crate:
//!
//! - [`HttpPlatformClient`]: talks to the platform REST API
//! - [`MemoryPlatform`]: in-process platform used for tests and local runs

mod http;
mod memory;
mod types;

pub use http::HttpPlatformClient;
pub use memory::{FailureMode, MemoryPlatform, Operation};
pub use types::{
    Agent, AgentSpec, AgentState, ApiErrorBody, ApiResponse, Swarm, SwarmSpec, SwarmStrategy,
};

use crate::error::Result;
use async_trait::async_trait;

/// Swarm and agent operations consumed from the platform.
///
/// `Err` means the call did not reach the platform or its response could not
/// be read. A reachable platform that refuses the operation answers with
/// `Ok(ApiResponse { success: false, .. })`.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Create a swarm
    async fn create_swarm(&self, spec: &SwarmSpec) -> Result<ApiResponse<Swarm>>;

    /// Destroy a swarm and everything in it
    async fn destroy_swarm(&self, swarm_id: &str, force: bool) -> Result<ApiResponse<()>>;

    /// Spawn an agent inside an existing swarm
    async fn spawn_agent(&self, spec: &AgentSpec) -> Result<ApiResponse<Agent>>;

    /// Kill an agent
    async fn kill_agent(&self, agent_id: &str, force: bool) -> Result<ApiResponse<()>>;

    /// Fetch an agent's current state
    async fn get_agent(&self, agent_id: &str) -> Result<ApiResponse<Agent>>;
}
