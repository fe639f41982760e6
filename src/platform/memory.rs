//! In-process platform
//!
//! Keeps swarms and agents in memory and lets callers inject failures per
//! operation. Used by the test suite and for running the bridge without a
//! platform deployment.

use super::types::*;
use super::PlatformClient;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Platform operation, used to target injected failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateSwarm,
    DestroySwarm,
    SpawnAgent,
    KillAgent,
    GetAgent,
}

/// How an injected failure manifests
#[derive(Debug, Clone)]
pub enum FailureMode {
    /// Platform answers `success: false` with this message
    Reject(String),
    /// The call fails before reaching the platform
    Transport(String),
}

#[derive(Default)]
struct PlatformState {
    swarms: HashMap<String, Swarm>,
    agents: HashMap<String, Agent>,
    failures: HashMap<Operation, FailureMode>,
    calls: Vec<(Operation, String)>,
}

/// In-memory [`PlatformClient`]
#[derive(Clone, Default)]
pub struct MemoryPlatform {
    state: Arc<RwLock<PlatformState>>,
}

impl MemoryPlatform {
    /// Create an empty platform
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `op` fail until cleared
    pub async fn fail(&self, op: Operation, mode: FailureMode) {
        self.state.write().await.failures.insert(op, mode);
    }

    /// Remove an injected failure
    pub async fn clear_failure(&self, op: Operation) {
        self.state.write().await.failures.remove(&op);
    }

    /// Number of live swarms
    pub async fn swarm_count(&self) -> usize {
        self.state.read().await.swarms.len()
    }

    /// Whether a swarm exists
    pub async fn has_swarm(&self, swarm_id: &str) -> bool {
        self.state.read().await.swarms.contains_key(swarm_id)
    }

    /// Snapshot of an agent
    pub async fn agent(&self, agent_id: &str) -> Option<Agent> {
        self.state.read().await.agents.get(agent_id).cloned()
    }

    /// Mutate an agent in place (simulates platform-side progress)
    pub async fn update_agent(&self, agent_id: &str, update: impl FnOnce(&mut Agent)) -> bool {
        match self.state.write().await.agents.get_mut(agent_id) {
            Some(agent) => {
                update(agent);
                true
            }
            None => false,
        }
    }

    /// Calls received so far, with the targeted id or name
    pub async fn calls(&self) -> Vec<(Operation, String)> {
        self.state.read().await.calls.clone()
    }

    /// Record the call and evaluate any injected failure
    async fn enter<T>(&self, op: Operation, target: &str) -> Result<Option<ApiResponse<T>>> {
        let mut state = self.state.write().await;
        state.calls.push((op, target.to_string()));
        match state.failures.get(&op) {
            Some(FailureMode::Transport(msg)) => Err(Error::Platform(msg.clone())),
            Some(FailureMode::Reject(msg)) => Ok(Some(ApiResponse::failure("REJECTED", msg.clone()))),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl PlatformClient for MemoryPlatform {
    async fn create_swarm(&self, spec: &SwarmSpec) -> Result<ApiResponse<Swarm>> {
        if let Some(failure) = self.enter(Operation::CreateSwarm, &spec.name).await? {
            return Ok(failure);
        }

        let swarm = Swarm {
            id: format!("swarm-{}", uuid::Uuid::new_v4()),
            name: spec.name.clone(),
            status: "active".to_string(),
        };
        self.state
            .write()
            .await
            .swarms
            .insert(swarm.id.clone(), swarm.clone());
        Ok(ApiResponse::ok(swarm))
    }

    async fn destroy_swarm(&self, swarm_id: &str, _force: bool) -> Result<ApiResponse<()>> {
        if let Some(failure) = self.enter(Operation::DestroySwarm, swarm_id).await? {
            return Ok(failure);
        }

        let mut state = self.state.write().await;
        if state.swarms.remove(swarm_id).is_none() {
            return Ok(ApiResponse::failure(
                "NOT_FOUND",
                format!("swarm {} not found", swarm_id),
            ));
        }
        state
            .agents
            .retain(|_, agent| agent.swarm_id.as_deref() != Some(swarm_id));
        Ok(ApiResponse::done())
    }

    async fn spawn_agent(&self, spec: &AgentSpec) -> Result<ApiResponse<Agent>> {
        if let Some(failure) = self.enter(Operation::SpawnAgent, &spec.swarm_id).await? {
            return Ok(failure);
        }

        let mut state = self.state.write().await;
        if !state.swarms.contains_key(&spec.swarm_id) {
            return Ok(ApiResponse::failure(
                "NOT_FOUND",
                format!("swarm {} not found", spec.swarm_id),
            ));
        }

        let agent = Agent {
            id: format!("agent-{}", uuid::Uuid::new_v4()),
            swarm_id: Some(spec.swarm_id.clone()),
            status: AgentState::Running,
            progress: None,
            result: None,
            last_error: None,
            runtime_ms: Some(0),
            metadata: HashMap::from([
                ("agentType".to_string(), serde_json::json!(spec.agent_type)),
                ("task".to_string(), serde_json::json!(spec.task)),
            ]),
        };
        state.agents.insert(agent.id.clone(), agent.clone());
        Ok(ApiResponse::ok(agent))
    }

    async fn kill_agent(&self, agent_id: &str, _force: bool) -> Result<ApiResponse<()>> {
        if let Some(failure) = self.enter(Operation::KillAgent, agent_id).await? {
            return Ok(failure);
        }

        match self.state.write().await.agents.get_mut(agent_id) {
            Some(agent) => {
                agent.status = AgentState::Killed;
                Ok(ApiResponse::done())
            }
            None => Ok(ApiResponse::failure(
                "NOT_FOUND",
                format!("agent {} not found", agent_id),
            )),
        }
    }

    async fn get_agent(&self, agent_id: &str) -> Result<ApiResponse<Agent>> {
        if let Some(failure) = self.enter(Operation::GetAgent, agent_id).await? {
            return Ok(failure);
        }

        match self.state.read().await.agents.get(agent_id) {
            Some(agent) => Ok(ApiResponse::ok(agent.clone())),
            None => Ok(ApiResponse::failure(
                "NOT_FOUND",
                format!("agent {} not found", agent_id),
            )),
        }
    }
}
