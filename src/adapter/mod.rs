//! OpenClaw lifecycle adapter
//!
//! Maps OpenClaw sessions onto platform agents:
//!
//! ```text
//! OpenClaw session ──spawn──► swarm (parallel, 1/1) ──► agent
//!        ▲                                               │
//!        └──── webhook ◄── transform ◄── agent.<id>.events
//! ```
//!
//! - [`registry`]: session ↔ agent/swarm/metadata mapping
//! - [`lifecycle`]: spawn, message, kill, status, list, dispose

pub mod lifecycle;
pub mod registry;

pub use lifecycle::{
    AgentStatusReport, AgentSummary, LifecycleAdapter, SpawnOptions, SpawnedAgent, ADAPTER_SOURCE,
};
pub use registry::{AgentMetadata, SessionEntry, SessionRegistry};
