//! Session ↔ agent identifier mapping
//!
//! Four maps keyed by session or agent. They are only mutated through
//! [`SessionRegistry::insert`], [`SessionRegistry::remove`] and
//! [`SessionRegistry::clear`], which keeps `session → agent` and
//! `agent → session` exact inverses and guarantees every mapped agent has
//! metadata and a swarm alongside it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Adapter-local description of a spawned agent
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMetadata {
    pub agent_type: String,
    pub created_at: DateTime<Utc>,
}

/// Everything recorded for one session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEntry {
    pub session_key: String,
    pub agent_id: String,
    pub swarm_id: Option<String>,
    pub metadata: AgentMetadata,
}

/// In-memory identifier mapping store
#[derive(Debug, Default)]
pub struct SessionRegistry {
    session_to_agent: HashMap<String, String>,
    agent_to_session: HashMap<String, String>,
    session_to_swarm: HashMap<String, String>,
    session_metadata: HashMap<String, AgentMetadata>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a session. Any previous mapping for the same session or agent
    /// is dropped first so the inverse maps never disagree.
    pub fn insert(&mut self, entry: SessionEntry) {
        self.remove(&entry.session_key);
        if let Some(previous_session) = self.agent_to_session.get(&entry.agent_id).cloned() {
            self.remove(&previous_session);
        }

        self.session_to_agent
            .insert(entry.session_key.clone(), entry.agent_id.clone());
        self.agent_to_session
            .insert(entry.agent_id, entry.session_key.clone());
        if let Some(swarm_id) = entry.swarm_id {
            self.session_to_swarm
                .insert(entry.session_key.clone(), swarm_id);
        }
        self.session_metadata
            .insert(entry.session_key, entry.metadata);
    }

    /// Remove every mapping for a session
    pub fn remove(&mut self, session_key: &str) -> Option<SessionEntry> {
        let agent_id = self.session_to_agent.remove(session_key)?;
        self.agent_to_session.remove(&agent_id);
        let swarm_id = self.session_to_swarm.remove(session_key);
        let metadata = self.session_metadata.remove(session_key)?;

        Some(SessionEntry {
            session_key: session_key.to_string(),
            agent_id,
            swarm_id,
            metadata,
        })
    }

    pub fn get(&self, session_key: &str) -> Option<SessionEntry> {
        let agent_id = self.session_to_agent.get(session_key)?;
        let metadata = self.session_metadata.get(session_key)?;
        Some(SessionEntry {
            session_key: session_key.to_string(),
            agent_id: agent_id.clone(),
            swarm_id: self.session_to_swarm.get(session_key).cloned(),
            metadata: metadata.clone(),
        })
    }

    pub fn agent_for(&self, session_key: &str) -> Option<&str> {
        self.session_to_agent.get(session_key).map(String::as_str)
    }

    pub fn session_for(&self, agent_id: &str) -> Option<&str> {
        self.agent_to_session.get(agent_id).map(String::as_str)
    }

    pub fn swarm_for(&self, session_key: &str) -> Option<&str> {
        self.session_to_swarm.get(session_key).map(String::as_str)
    }

    pub fn metadata_for(&self, session_key: &str) -> Option<&AgentMetadata> {
        self.session_metadata.get(session_key)
    }

    /// All entries, ordered by creation time
    pub fn snapshot(&self) -> Vec<SessionEntry> {
        let mut entries: Vec<SessionEntry> = self
            .session_to_agent
            .keys()
            .filter_map(|key| self.get(key))
            .collect();
        entries.sort_by(|a, b| {
            a.metadata
                .created_at
                .cmp(&b.metadata.created_at)
                .then_with(|| a.session_key.cmp(&b.session_key))
        });
        entries
    }

    pub fn len(&self) -> usize {
        self.session_to_agent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.session_to_agent.is_empty()
    }

    pub fn clear(&mut self) {
        self.session_to_agent.clear();
        self.agent_to_session.clear();
        self.session_to_swarm.clear();
        self.session_metadata.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(session: &str, agent: &str, swarm: Option<&str>) -> SessionEntry {
        SessionEntry {
            session_key: session.to_string(),
            agent_id: agent.to_string(),
            swarm_id: swarm.map(str::to_string),
            metadata: AgentMetadata {
                agent_type: "researcher".to_string(),
                created_at: Utc::now(),
            },
        }
    }

    #[test]
    fn test_insert_and_lookup_are_inverse() {
        let mut registry = SessionRegistry::new();
        registry.insert(entry("sess-1", "agent-1", Some("swarm-1")));

        assert_eq!(registry.agent_for("sess-1"), Some("agent-1"));
        assert_eq!(registry.session_for("agent-1"), Some("sess-1"));
        assert_eq!(registry.swarm_for("sess-1"), Some("swarm-1"));
        assert_eq!(
            registry.metadata_for("sess-1").map(|m| m.agent_type.as_str()),
            Some("researcher")
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_clears_all_maps() {
        let mut registry = SessionRegistry::new();
        registry.insert(entry("sess-1", "agent-1", Some("swarm-1")));

        let removed = registry.remove("sess-1").unwrap();
        assert_eq!(removed.agent_id, "agent-1");
        assert_eq!(removed.swarm_id.as_deref(), Some("swarm-1"));

        assert!(registry.is_empty());
        assert_eq!(registry.session_for("agent-1"), None);
        assert_eq!(registry.swarm_for("sess-1"), None);
        assert!(registry.metadata_for("sess-1").is_none());
        assert!(registry.remove("sess-1").is_none());
    }

    #[test]
    fn test_reinsert_keeps_maps_inverse() {
        let mut registry = SessionRegistry::new();
        registry.insert(entry("sess-1", "agent-1", None));
        registry.insert(entry("sess-1", "agent-2", None));

        assert_eq!(registry.agent_for("sess-1"), Some("agent-2"));
        assert_eq!(registry.session_for("agent-1"), None);
        assert_eq!(registry.session_for("agent-2"), Some("sess-1"));

        // Same agent claimed by another session
        registry.insert(entry("sess-2", "agent-2", None));
        assert_eq!(registry.agent_for("sess-1"), None);
        assert_eq!(registry.session_for("agent-2"), Some("sess-2"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_snapshot_and_clear() {
        let mut registry = SessionRegistry::new();
        registry.insert(entry("sess-1", "agent-1", Some("swarm-1")));
        registry.insert(entry("sess-2", "agent-2", Some("swarm-2")));

        let keys: Vec<String> = registry
            .snapshot()
            .into_iter()
            .map(|e| e.session_key)
            .collect();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&"sess-1".to_string()));

        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.snapshot().is_empty());
    }
}
