//! Bridged event schema, transformation and local fan-out

mod emitter;
mod transform;
mod types;

pub use emitter::{EventEmitter, EventListener, ListenerId, LocalSubscription};
pub use transform::{transform, transform_topic};
pub use types::{BridgedEvent, EventBatch, AGENT_ID_KEY, EVENT_SOURCE, SWARM_ID_KEY};
