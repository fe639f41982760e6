//! ClawBridge - OpenClaw session adapter and event bridge for the Dash agent platform
//!
//! ClawBridge translates in both directions between OpenClaw, which thinks in
//! sessions, and the platform, which runs agents inside swarms and publishes
//! their activity on an internal message bus.
//!
//! ## Architecture
//!
//! ```text
//!            OpenClaw                                   Webhook receiver
//!               │ spawn / message / kill / status              ▲
//! ┌─────────────▼─────────────────────────────────────────────┼──────────┐
//! │  ┌──────────────────────┐                   ┌─────────────┴───────┐  │
//! │  │   LifecycleAdapter   │                   │     EventBridge     │  │
//! │  │  session ↔ agent map │                   │  dedup → transform  │  │
//! │  │  per-agent forwarding│                   │  filter → batch     │  │
//! │  └───┬──────────────┬───┘                   └──────────▲──────────┘  │
//! │      │ REST         │ agent.<id>.inbox                 │ agent.*.events
//! │      │              └──────────────┐   ┌───────────────┘ swarm.*.events
//! │      ▼                             ▼   │                 system.events, #
//! │  PlatformClient                   MessageBus                          │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`adapter`]: OpenClaw session lifecycle on top of platform agents
//! - [`bridge`]: Bus → webhook forwarding with filtering and batching
//! - [`bus`]: Topic-based message bus abstraction and in-memory implementation
//! - [`events`]: External event schema, transformation and local fan-out
//! - [`platform`]: Platform REST client
//! - [`webhook`]: Outbound webhook delivery with retry
//! - [`context`]: Explicit init/shutdown registry for the adapter and bridge
//! - [`api`]: HTTP control API
//! - [`config`]: Configuration management

pub mod adapter;
pub mod api;
pub mod bridge;
pub mod bus;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod platform;
pub mod webhook;

pub use config::ClawBridgeConfig;
pub use error::{Error, Result};
