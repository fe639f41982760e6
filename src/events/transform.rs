//! Bus message → [`BridgedEvent`] transformation
//!
//! Pure functions: no I/O, no clock reads beyond what the message carries.

use super::types::*;
use crate::bus::BusMessage;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Transform a message received on a known agent's topic.
pub fn transform(message: &BusMessage, agent_id: Option<&str>) -> BridgedEvent {
    build(message, agent_id, None)
}

/// Transform a message, deriving agent or swarm ids from the topic
/// (`agent.<id>.*` or `swarm.<id>.*`).
pub fn transform_topic(message: &BusMessage) -> BridgedEvent {
    let (agent_id, swarm_id) = ids_from_topic(&message.topic);
    build(message, agent_id, swarm_id)
}

fn build(message: &BusMessage, agent_id: Option<&str>, swarm_id: Option<&str>) -> BridgedEvent {
    let payload = &message.payload;

    let event_type = payload
        .get("eventType")
        .and_then(Value::as_str)
        .unwrap_or(&message.topic)
        .to_string();

    let timestamp = payload
        .get("timestamp")
        .and_then(parse_timestamp)
        .unwrap_or(message.timestamp);

    let data = if payload.is_null() {
        Value::Object(Map::new())
    } else {
        payload.clone()
    };

    // Payload metadata first; envelope fields overwrite it.
    let mut metadata = payload
        .get("metadata")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    if let Some(id) = agent_id {
        metadata.insert(AGENT_ID_KEY.to_string(), Value::from(id));
    }
    if let Some(id) = swarm_id {
        metadata.insert(SWARM_ID_KEY.to_string(), Value::from(id));
    }
    metadata.insert("messageId".to_string(), Value::from(message.id.as_str()));
    metadata.insert("topic".to_string(), Value::from(message.topic.as_str()));
    metadata.insert("source".to_string(), Value::from(message.source.as_str()));
    metadata.insert("priority".to_string(), Value::from(message.priority.as_str()));

    BridgedEvent {
        source: EVENT_SOURCE.to_string(),
        event_type,
        timestamp,
        data,
        metadata,
    }
}

fn ids_from_topic(topic: &str) -> (Option<&str>, Option<&str>) {
    let mut segments = topic.splitn(3, '.');
    let (kind, id, rest) = (segments.next(), segments.next(), segments.next());
    match (kind, id, rest) {
        (Some("agent"), Some(id), Some(_)) if !id.is_empty() => (Some(id), None),
        (Some("swarm"), Some(id), Some(_)) if !id.is_empty() => (None, Some(id)),
        _ => (None, None),
    }
}

/// Accepts RFC 3339 strings and epoch milliseconds
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{Priority, PublishOptions};
    use serde_json::json;

    fn message(topic: &str, payload: Value) -> BusMessage {
        BusMessage::new(topic, payload, PublishOptions::new("agent-runtime", Priority::Normal))
    }

    #[test]
    fn test_type_from_payload() {
        let msg = message("agent.a1.events", json!({"eventType": "progress", "value": 0.4}));
        let event = transform(&msg, Some("a1"));

        assert_eq!(event.source, "dash");
        assert_eq!(event.event_type, "progress");
        assert_eq!(event.data["value"], 0.4);
        assert_eq!(event.agent_id(), Some("a1"));
        assert_eq!(event.metadata["messageId"], msg.id.as_str());
        assert_eq!(event.metadata["topic"], "agent.a1.events");
        assert_eq!(event.metadata["source"], "agent-runtime");
        assert_eq!(event.metadata["priority"], "normal");
    }

    #[test]
    fn test_type_falls_back_to_topic() {
        let msg = message("system.events", json!({"status": "ok"}));
        let event = transform_topic(&msg);
        assert_eq!(event.event_type, "system.events");
        assert_eq!(event.agent_id(), None);
        assert_eq!(event.swarm_id(), None);
    }

    #[test]
    fn test_null_payload_becomes_empty_object() {
        let msg = message("system.events", Value::Null);
        let event = transform_topic(&msg);
        assert_eq!(event.data, json!({}));
        assert_eq!(event.timestamp, msg.timestamp);
    }

    #[test]
    fn test_payload_timestamp_wins() {
        let msg = message(
            "agent.a1.events",
            json!({"timestamp": "2024-05-01T12:00:00Z"}),
        );
        let event = transform(&msg, Some("a1"));
        assert_eq!(event.timestamp.to_rfc3339(), "2024-05-01T12:00:00+00:00");

        let msg = message("agent.a1.events", json!({"timestamp": 1_714_564_800_000i64}));
        let event = transform(&msg, Some("a1"));
        assert_eq!(event.timestamp.timestamp_millis(), 1_714_564_800_000);

        let msg = message("agent.a1.events", json!({"timestamp": "yesterday"}));
        let event = transform(&msg, Some("a1"));
        assert_eq!(event.timestamp, msg.timestamp);
    }

    #[test]
    fn test_builtin_metadata_cannot_be_overridden() {
        let msg = message(
            "agent.a1.events",
            json!({
                "metadata": {
                    "dashAgentId": "spoofed",
                    "topic": "spoofed",
                    "traceId": "t-1"
                }
            }),
        );
        let event = transform_topic(&msg);
        assert_eq!(event.agent_id(), Some("a1"));
        assert_eq!(event.metadata["topic"], "agent.a1.events");
        assert_eq!(event.metadata["traceId"], "t-1");
    }

    #[test]
    fn test_ids_from_topic() {
        assert_eq!(ids_from_topic("agent.a1.events"), (Some("a1"), None));
        assert_eq!(ids_from_topic("swarm.s9.events"), (None, Some("s9")));
        assert_eq!(ids_from_topic("agent.a1"), (None, None));
        assert_eq!(ids_from_topic("system.events"), (None, None));
    }

    #[test]
    fn test_serialized_shape() {
        let msg = message("agent.a1.events", json!({"eventType": "progress"}));
        let value = serde_json::to_value(transform_topic(&msg)).unwrap();
        assert_eq!(value["type"], "progress");
        assert_eq!(value["source"], "dash");
        assert_eq!(value["metadata"]["dashAgentId"], "a1");
    }
}
