//! Event bridge
//!
//! Subscribes to the platform's event topics, normalizes every message into a
//! [`BridgedEvent`](crate::events::BridgedEvent) and forwards it to a webhook,
//! either one request per event or in batches.
//!
//! ```text
//! bus ──► dedup ──► transform ──► local listeners
//!                        │
//!                        └─► filter ──► buffer ──► webhook
//! ```
//!
//! The type filter gates webhook delivery only; local listeners registered
//! with `subscribe_to_*` see every event.

mod event_bridge;
mod stats;

pub use event_bridge::{EventBridge, BRIDGE_PATTERNS};
pub use stats::{BridgeHealth, BridgeStats, HealthStatus};
