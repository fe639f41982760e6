//! Externally-facing event schema
//!
//! These are the bodies POSTed to webhooks, so field names follow the
//! external camelCase convention.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Value of [`BridgedEvent::source`] for every event leaving the bridge
pub const EVENT_SOURCE: &str = "dash";

/// Metadata key carrying the originating agent id
pub const AGENT_ID_KEY: &str = "dashAgentId";

/// Metadata key carrying the originating swarm id
pub const SWARM_ID_KEY: &str = "dashSwarmId";

/// A platform event normalized for the external system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgedEvent {
    pub source: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl BridgedEvent {
    /// Agent the event originated from, if known
    pub fn agent_id(&self) -> Option<&str> {
        self.metadata.get(AGENT_ID_KEY).and_then(|v| v.as_str())
    }

    /// Swarm the event originated from, if known
    pub fn swarm_id(&self) -> Option<&str> {
        self.metadata.get(SWARM_ID_KEY).and_then(|v| v.as_str())
    }
}

/// Body of a batched webhook delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBatch {
    pub events: Vec<BridgedEvent>,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

impl EventBatch {
    pub fn new(events: Vec<BridgedEvent>) -> Self {
        Self {
            events,
            timestamp: Utc::now(),
            source: EVENT_SOURCE.to_string(),
        }
    }
}
