//! Platform publish/subscribe bus interface
//!
//! ## Topic convention
//!
//! Topics are dot-separated segments:
//!
//! - `agent.<agent_id>.events`  — events emitted by an agent
//! - `agent.<agent_id>.inbox`   — messages delivered to an agent
//! - `swarm.<swarm_id>.events`  — swarm-level events
//! - `system.events`            — platform-wide events
//!
//! Patterns use `*` for exactly one segment and `#` for any number of
//! trailing segments. A bare `#` matches every topic.

mod memory;

pub use memory::MemoryBus;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Pattern that matches every topic
pub const CATCH_ALL: &str = "#";

/// Message priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Envelope options for [`MessageBus::publish`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishOptions {
    pub source: String,
    #[serde(default)]
    pub priority: Priority,
}

impl PublishOptions {
    pub fn new(source: impl Into<String>, priority: Priority) -> Self {
        Self {
            source: source.into(),
            priority,
        }
    }
}

/// A message as delivered to subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusMessage {
    pub id: String,
    pub topic: String,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
    pub source: String,
    pub priority: Priority,
}

impl BusMessage {
    /// Build a message with a fresh id and the current time
    pub fn new(topic: impl Into<String>, payload: serde_json::Value, options: PublishOptions) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            topic: topic.into(),
            timestamp: Utc::now(),
            payload,
            source: options.source,
            priority: options.priority,
        }
    }
}

/// Subscriber callback. Invoked synchronously by the bus; network work
/// belongs in a spawned task.
pub type BusHandler = Arc<dyn Fn(&BusMessage) + Send + Sync>;

/// Opaque handle returned by [`MessageBus::subscribe`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: u64,
    pattern: String,
}

impl SubscriptionHandle {
    pub(crate) fn new(id: u64, pattern: impl Into<String>) -> Self {
        Self {
            id,
            pattern: pattern.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// Topic-based publish/subscribe bus
pub trait MessageBus: Send + Sync {
    /// Register `handler` for every topic matching `pattern`
    fn subscribe(&self, pattern: &str, handler: BusHandler) -> SubscriptionHandle;

    /// Remove a subscription; `false` if it was not registered
    fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool;

    /// Publish a payload on `topic` and return the delivered envelope
    fn publish(&self, topic: &str, payload: serde_json::Value, options: PublishOptions) -> BusMessage;
}

/// Whether `topic` matches the subscription `pattern`
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    if pattern == CATCH_ALL {
        return true;
    }

    let mut pattern_segments = pattern.split('.');
    let mut topic_segments = topic.split('.');
    loop {
        match (pattern_segments.next(), topic_segments.next()) {
            (Some("#"), _) => return true,
            (Some("*"), Some(_)) => continue,
            (Some(p), Some(t)) if p == t => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(topic_matches("system.events", "system.events"));
        assert!(!topic_matches("system.events", "system.alerts"));
        assert!(!topic_matches("system.events", "system.events.extra"));
    }

    #[test]
    fn test_single_segment_wildcard() {
        assert!(topic_matches("agent.*.events", "agent.a1.events"));
        assert!(!topic_matches("agent.*.events", "agent.a1.inbox"));
        assert!(!topic_matches("agent.*.events", "agent.events"));
        assert!(!topic_matches("agent.*.events", "agent.a1.b2.events"));
    }

    #[test]
    fn test_catch_all() {
        assert!(topic_matches("#", "anything.at.all"));
        assert!(topic_matches("#", "single"));
        assert!(topic_matches("agent.#", "agent.a1.events"));
        assert!(topic_matches("agent.#", "agent"));
        assert!(!topic_matches("agent.#", "swarm.s1.events"));
    }

    #[test]
    fn test_priority_serialization() {
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
        assert_eq!(Priority::default(), Priority::Normal);
    }
}
