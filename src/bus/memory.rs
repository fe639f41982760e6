//! In-process message bus

use super::*;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

struct Subscriber {
    id: u64,
    pattern: String,
    handler: BusHandler,
}

/// In-memory [`MessageBus`].
///
/// Handlers run on the publishing task, in subscription order. The handler
/// table is not locked while handlers run, so a handler may subscribe or
/// unsubscribe.
#[derive(Default)]
pub struct MemoryBus {
    subscribers: RwLock<Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl MemoryBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl MessageBus for MemoryBus {
    fn subscribe(&self, pattern: &str, handler: BusHandler) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.subscribers.write().push(Subscriber {
            id,
            pattern: pattern.to_string(),
            handler,
        });
        tracing::debug!(id, pattern, "Bus subscription added");
        SubscriptionHandle::new(id, pattern)
    }

    fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != handle.id());
        let removed = subscribers.len() != before;
        if removed {
            tracing::debug!(id = handle.id(), pattern = handle.pattern(), "Bus subscription removed");
        }
        removed
    }

    fn publish(&self, topic: &str, payload: serde_json::Value, options: PublishOptions) -> BusMessage {
        let message = BusMessage::new(topic, payload, options);

        let handlers: Vec<BusHandler> = self
            .subscribers
            .read()
            .iter()
            .filter(|s| topic_matches(&s.pattern, topic))
            .map(|s| s.handler.clone())
            .collect();

        if handlers.is_empty() {
            tracing::debug!(topic, "No subscribers for topic");
        }

        for handler in handlers {
            handler(&message);
        }

        message
    }
}
