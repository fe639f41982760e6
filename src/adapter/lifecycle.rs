//! OpenClaw session lifecycle on top of the platform
//!
//! Each OpenClaw session gets its own single-agent swarm. The adapter keeps
//! the session ↔ agent mapping and forwards the agent's events to the
//! session webhook until the session is killed.

use super::registry::{AgentMetadata, SessionEntry, SessionRegistry};
use crate::bus::{BusHandler, BusMessage, MessageBus, Priority, PublishOptions, SubscriptionHandle};
use crate::config::AdapterConfig;
use crate::error::{Error, Result};
use crate::events::{self, BridgedEvent, EventEmitter, EventListener, LocalSubscription};
use crate::platform::{AgentSpec, AgentState, PlatformClient, SwarmSpec, SwarmStrategy};
use crate::webhook::{HttpWebhook, WebhookDelivery};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::RwLock;

/// `source` recorded on messages the adapter publishes
pub const ADAPTER_SOURCE: &str = "openclaw-adapter";

// =============================================================================
// Request / response types
// =============================================================================

/// Options for [`LifecycleAdapter::spawn_agent`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnOptions {
    pub agent_type: String,
    pub task: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Forwarded to the platform; not enforced locally
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

impl SpawnOptions {
    pub fn new(agent_type: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            agent_type: agent_type.into(),
            task: task.into(),
            model: None,
            timeout_ms: None,
            config: HashMap::new(),
        }
    }
}

/// Result of a successful spawn
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnedAgent {
    pub agent_id: String,
    pub swarm_id: String,
    pub status: AgentState,
}

/// Status of a session's agent as seen by the platform
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatusReport {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_ms: Option<u64>,
}

impl AgentStatusReport {
    /// Sentinel for unmapped sessions and failed lookups
    pub fn not_found() -> Self {
        Self {
            status: "not_found".to_string(),
            progress: None,
            result: None,
            last_error: None,
            runtime_ms: None,
        }
    }
}

/// One entry of [`LifecycleAdapter::list_agents`]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    pub openclaw_session_key: String,
    pub agent_id: String,
    pub swarm_id: Option<String>,
    pub agent_type: String,
    pub created_at: DateTime<Utc>,
    pub status: String,
}

// =============================================================================
// LifecycleAdapter
// =============================================================================

/// Translates OpenClaw session commands into platform operations.
pub struct LifecycleAdapter {
    platform: Arc<dyn PlatformClient>,
    bus: Arc<dyn MessageBus>,
    webhook: Option<Arc<dyn WebhookDelivery>>,
    registry: RwLock<SessionRegistry>,
    subscriptions: RwLock<HashMap<String, SubscriptionHandle>>,
    emitter: Arc<EventEmitter>,
}

impl LifecycleAdapter {
    /// Create an adapter; a webhook client is built when the config names one.
    pub fn new(
        platform: Arc<dyn PlatformClient>,
        bus: Arc<dyn MessageBus>,
        config: &AdapterConfig,
    ) -> Self {
        let webhook = config.webhook_url.as_ref().map(|url| {
            Arc::new(HttpWebhook::new(
                url.clone(),
                config.auth_token.clone(),
                config.retry,
            )) as Arc<dyn WebhookDelivery>
        });
        Self::with_webhook(platform, bus, webhook)
    }

    /// Create an adapter with an explicit webhook (or none)
    pub fn with_webhook(
        platform: Arc<dyn PlatformClient>,
        bus: Arc<dyn MessageBus>,
        webhook: Option<Arc<dyn WebhookDelivery>>,
    ) -> Self {
        Self {
            platform,
            bus,
            webhook,
            registry: RwLock::new(SessionRegistry::new()),
            subscriptions: RwLock::new(HashMap::new()),
            emitter: Arc::new(EventEmitter::new()),
        }
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Create a single-agent swarm for the session and spawn the agent in it.
    ///
    /// Fails with [`Error::SessionAlreadyActive`] when the session already
    /// has an agent; kill it first to replace it.
    pub async fn spawn_agent(
        &self,
        session_key: &str,
        options: SpawnOptions,
    ) -> Result<SpawnedAgent> {
        let runtime = Handle::try_current().map_err(|e| {
            Error::InitializationFailed(format!("lifecycle adapter requires a tokio runtime: {}", e))
        })?;
        self.ensure_unmapped(session_key).await?;

        tracing::info!(
            session_key,
            agent_type = %options.agent_type,
            "Spawning agent for OpenClaw session"
        );

        let swarm_spec = SwarmSpec {
            name: format!("openclaw-{}", session_key),
            strategy: SwarmStrategy::Parallel,
            initial_agents: 1,
            max_agents: 1,
            config: HashMap::from([(
                "openclawSessionKey".to_string(),
                serde_json::json!(session_key),
            )]),
        };

        let swarm = match self.platform.create_swarm(&swarm_spec).await {
            Ok(resp) if resp.success => resp.data.ok_or_else(|| Error::SwarmCreateFailed {
                session_key: session_key.to_string(),
                details: "platform returned no swarm".to_string(),
            })?,
            Ok(resp) => {
                let details = resp.error_details();
                tracing::error!(session_key, "Swarm creation rejected: {}", details);
                return Err(Error::SwarmCreateFailed {
                    session_key: session_key.to_string(),
                    details,
                });
            }
            Err(e) => {
                tracing::error!(session_key, "Swarm creation failed: {}", e);
                return Err(Error::SwarmCreateFailed {
                    session_key: session_key.to_string(),
                    details: e.to_string(),
                });
            }
        };

        let agent_spec = AgentSpec {
            swarm_id: swarm.id.clone(),
            agent_type: options.agent_type.clone(),
            task: options.task.clone(),
            model: options.model.clone(),
            timeout_ms: options.timeout_ms,
            config: options.config.clone(),
        };

        let spawn_failure = match self.platform.spawn_agent(&agent_spec).await {
            Ok(resp) if resp.success => match resp.data {
                Some(agent) => Ok(agent),
                None => Err("platform returned no agent".to_string()),
            },
            Ok(resp) => Err(resp.error_details()),
            Err(e) => Err(e.to_string()),
        };
        let agent = match spawn_failure {
            Ok(agent) => agent,
            Err(details) => {
                tracing::error!(session_key, swarm_id = %swarm.id, "Agent spawn failed: {}", details);
                self.teardown_swarm(session_key, &swarm.id).await;
                return Err(Error::AgentSpawnFailed {
                    session_key: session_key.to_string(),
                    swarm_id: swarm.id,
                    details,
                });
            }
        };

        let entry = SessionEntry {
            session_key: session_key.to_string(),
            agent_id: agent.id.clone(),
            swarm_id: Some(swarm.id.clone()),
            metadata: AgentMetadata {
                agent_type: options.agent_type,
                created_at: Utc::now(),
            },
        };

        {
            let mut registry = self.registry.write().await;
            if let Some(existing) = registry.agent_for(session_key) {
                // Another spawn for this session finished first.
                let existing = existing.to_string();
                drop(registry);
                self.discard_agent(session_key, &agent.id, &swarm.id).await;
                return Err(Error::SessionAlreadyActive {
                    session_key: session_key.to_string(),
                    agent_id: existing,
                });
            }
            registry.insert(entry);
        }

        let handle = self.subscribe_agent_events(session_key, &agent.id, runtime);
        self.subscriptions
            .write()
            .await
            .insert(session_key.to_string(), handle);

        tracing::info!(
            session_key,
            agent_id = %agent.id,
            swarm_id = %swarm.id,
            "Agent spawned"
        );

        Ok(SpawnedAgent {
            agent_id: agent.id,
            swarm_id: swarm.id,
            status: agent.status,
        })
    }

    /// Publish a message on the agent's inbox topic. Fire-and-forget.
    pub async fn send_message(&self, session_key: &str, text: &str) -> Result<()> {
        let agent_id = self
            .registry
            .read()
            .await
            .agent_for(session_key)
            .map(str::to_string)
            .ok_or_else(|| Error::SessionNotFound(session_key.to_string()))?;

        let payload = serde_json::json!({
            "type": "message",
            "content": text,
            "sessionKey": session_key,
            "timestamp": Utc::now(),
        });
        let message = self.bus.publish(
            &inbox_topic(&agent_id),
            payload,
            PublishOptions::new(ADAPTER_SOURCE, Priority::High),
        );

        tracing::debug!(
            session_key,
            agent_id = %agent_id,
            message_id = %message.id,
            "Message sent to agent"
        );
        Ok(())
    }

    /// Kill the session's agent and forget the session.
    ///
    /// Unmapped sessions are a no-op. A transport failure of the platform
    /// kill call is returned and leaves the session mapped so the caller can
    /// retry; a refusal reported by the platform is logged and the session is
    /// removed anyway.
    pub async fn kill_agent(&self, session_key: &str, force: bool) -> Result<()> {
        let entry = match self.registry.read().await.get(session_key) {
            Some(entry) => entry,
            None => {
                tracing::warn!(session_key, "Kill requested for unknown session");
                return Ok(());
            }
        };

        tracing::info!(session_key, agent_id = %entry.agent_id, force, "Killing agent");

        match self.platform.kill_agent(&entry.agent_id, force).await {
            Ok(resp) if !resp.success => {
                tracing::warn!(
                    session_key,
                    agent_id = %entry.agent_id,
                    "Platform refused kill: {}",
                    resp.error_details()
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(session_key, agent_id = %entry.agent_id, "Kill failed: {}", e);
                return Err(e);
            }
        }

        if let Some(swarm_id) = &entry.swarm_id {
            self.teardown_swarm(session_key, swarm_id).await;
        }

        if let Some(handle) = self.subscriptions.write().await.remove(session_key) {
            self.bus.unsubscribe(&handle);
        }
        self.registry.write().await.remove(session_key);

        tracing::info!(session_key, agent_id = %entry.agent_id, "Agent killed");
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current status of the session's agent. Never fails: unmapped sessions
    /// and failed lookups report `not_found`.
    pub async fn get_status(&self, session_key: &str) -> AgentStatusReport {
        let agent_id = match self.get_agent_id(session_key).await {
            Some(id) => id,
            None => return AgentStatusReport::not_found(),
        };

        match self.platform.get_agent(&agent_id).await {
            Ok(resp) if resp.success => match resp.data {
                Some(agent) => AgentStatusReport {
                    status: agent.status.to_string(),
                    progress: agent.effective_progress(),
                    result: agent.effective_result(),
                    last_error: agent.last_error.clone(),
                    runtime_ms: agent.runtime_ms,
                },
                None => AgentStatusReport::not_found(),
            },
            Ok(resp) => {
                tracing::debug!(session_key, agent_id = %agent_id, "Status lookup refused: {}", resp.error_details());
                AgentStatusReport::not_found()
            }
            Err(e) => {
                tracing::warn!(session_key, agent_id = %agent_id, "Status lookup failed: {}", e);
                AgentStatusReport::not_found()
            }
        }
    }

    /// Every mapped session with its live status (`unknown` when the lookup
    /// fails).
    pub async fn list_agents(&self) -> Vec<AgentSummary> {
        let entries = self.registry.read().await.snapshot();

        let lookups = entries.iter().map(|entry| async move {
            match self.platform.get_agent(&entry.agent_id).await {
                Ok(resp) if resp.success => resp
                    .data
                    .map(|agent| agent.status.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                Ok(_) => "unknown".to_string(),
                Err(e) => {
                    tracing::warn!(agent_id = %entry.agent_id, "Status lookup failed: {}", e);
                    "unknown".to_string()
                }
            }
        });
        let statuses = futures::future::join_all(lookups).await;

        entries
            .into_iter()
            .zip(statuses)
            .map(|(entry, status)| AgentSummary {
                openclaw_session_key: entry.session_key,
                agent_id: entry.agent_id,
                swarm_id: entry.swarm_id,
                agent_type: entry.metadata.agent_type,
                created_at: entry.metadata.created_at,
                status,
            })
            .collect()
    }

    pub async fn get_agent_id(&self, session_key: &str) -> Option<String> {
        self.registry
            .read()
            .await
            .agent_for(session_key)
            .map(str::to_string)
    }

    pub async fn get_session_key(&self, agent_id: &str) -> Option<String> {
        self.registry
            .read()
            .await
            .session_for(agent_id)
            .map(str::to_string)
    }

    pub async fn get_swarm_id(&self, session_key: &str) -> Option<String> {
        self.registry
            .read()
            .await
            .swarm_for(session_key)
            .map(str::to_string)
    }

    pub async fn session_count(&self) -> usize {
        self.registry.read().await.len()
    }

    /// Number of live per-agent forwarding subscriptions
    pub async fn subscription_count(&self) -> usize {
        self.subscriptions.read().await.len()
    }

    /// Listen to every event forwarded for any session
    pub fn subscribe_events(&self, listener: EventListener) -> LocalSubscription {
        self.emitter.listen(listener)
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Kill every session (forced) and drop all state.
    ///
    /// Per-session failures are returned as warnings. State is cleared even
    /// when kills fail, and calling it again is harmless.
    pub async fn dispose(&self) -> Vec<String> {
        let sessions: Vec<String> = self
            .registry
            .read()
            .await
            .snapshot()
            .into_iter()
            .map(|e| e.session_key)
            .collect();

        let mut warnings = Vec::new();
        for session_key in &sessions {
            if let Err(e) = self.kill_agent(session_key, true).await {
                tracing::warn!(session_key = %session_key, "Failed to kill agent during dispose: {}", e);
                warnings.push(format!("{}: {}", session_key, e));
            }
        }

        self.registry.write().await.clear();
        for (_, handle) in self.subscriptions.write().await.drain() {
            self.bus.unsubscribe(&handle);
        }

        if !sessions.is_empty() {
            tracing::info!(
                sessions = sessions.len(),
                warnings = warnings.len(),
                "Lifecycle adapter disposed"
            );
        }
        warnings
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn ensure_unmapped(&self, session_key: &str) -> Result<()> {
        match self.registry.read().await.agent_for(session_key) {
            Some(agent_id) => Err(Error::SessionAlreadyActive {
                session_key: session_key.to_string(),
                agent_id: agent_id.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Forced swarm destroy; failures are logged only
    async fn teardown_swarm(&self, session_key: &str, swarm_id: &str) {
        match self.platform.destroy_swarm(swarm_id, true).await {
            Ok(resp) if !resp.success => {
                tracing::warn!(session_key, swarm_id, "Swarm destroy refused: {}", resp.error_details());
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(session_key, swarm_id, "Swarm destroy failed: {}", e);
            }
        }
    }

    async fn discard_agent(&self, session_key: &str, agent_id: &str, swarm_id: &str) {
        if let Err(e) = self.platform.kill_agent(agent_id, true).await {
            tracing::warn!(session_key, agent_id, "Failed to kill discarded agent: {}", e);
        }
        self.teardown_swarm(session_key, swarm_id).await;
    }

    fn subscribe_agent_events(
        &self,
        session_key: &str,
        agent_id: &str,
        runtime: Handle,
    ) -> SubscriptionHandle {
        let topic = events_topic(agent_id);
        let session_key = session_key.to_string();
        let agent_id = agent_id.to_string();
        let emitter = self.emitter.clone();
        let webhook = self.webhook.clone();

        let handler: BusHandler = Arc::new(move |message: &BusMessage| {
            let event = events::transform(message, Some(agent_id.as_str()));
            emitter.emit(&event);

            if let Some(webhook) = webhook.clone() {
                let session_key = session_key.clone();
                runtime.spawn(forward_event(webhook, event, session_key));
            }
        });

        self.bus.subscribe(&topic, handler)
    }
}

fn events_topic(agent_id: &str) -> String {
    format!("agent.{}.events", agent_id)
}

fn inbox_topic(agent_id: &str) -> String {
    format!("agent.{}.inbox", agent_id)
}

async fn forward_event(webhook: Arc<dyn WebhookDelivery>, event: BridgedEvent, session_key: String) {
    if let Err(e) = webhook.send_event(&event, Some(session_key.as_str())).await {
        tracing::warn!(
            session_key = %session_key,
            event_type = %event.event_type,
            "Failed to forward agent event: {}",
            e
        );
    }
}
