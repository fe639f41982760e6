//! Local in-process event fan-out
//!
//! Listeners are called synchronously, in registration order, on the task
//! that emits. There is no buffering: a listener that needs to do I/O should
//! hand the event to its own task.

use super::types::BridgedEvent;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Listener callback
pub type EventListener = Arc<dyn Fn(&BridgedEvent) + Send + Sync>;

/// Identifier of a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Observer list for [`BridgedEvent`]s
#[derive(Default)]
pub struct EventEmitter {
    listeners: RwLock<Vec<(ListenerId, EventListener)>>,
    next_id: AtomicU64,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn subscribe(&self, listener: EventListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.listeners.write().push((id, listener));
        id
    }

    /// Register a listener and get a handle that removes it
    pub fn listen(self: &Arc<Self>, listener: EventListener) -> LocalSubscription {
        let id = self.subscribe(listener);
        LocalSubscription {
            emitter: Arc::downgrade(self),
            id,
        }
    }

    /// Remove a listener; `false` if it was not registered
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Dispatch an event to every listener
    pub fn emit(&self, event: &BridgedEvent) {
        let listeners: Vec<EventListener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

/// Handle for a listener registered through [`EventEmitter::listen`]
#[derive(Debug)]
pub struct LocalSubscription {
    emitter: Weak<EventEmitter>,
    id: ListenerId,
}

impl LocalSubscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Remove the listener. Safe to call after the emitter is gone.
    pub fn unsubscribe(self) -> bool {
        match self.emitter.upgrade() {
            Some(emitter) => emitter.unsubscribe(self.id),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{BusMessage, PublishOptions};
    use crate::events::transform_topic;
    use parking_lot::Mutex;

    fn event(topic: &str) -> BridgedEvent {
        transform_topic(&BusMessage::new(
            topic,
            serde_json::json!({}),
            PublishOptions::default(),
        ))
    }

    #[test]
    fn test_emit_in_registration_order() {
        let emitter = EventEmitter::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for n in 0..3 {
            let order = order.clone();
            emitter.subscribe(Arc::new(move |_e: &BridgedEvent| order.lock().push(n)));
        }

        emitter.emit(&event("system.events"));
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_local_subscription_unsubscribe() {
        let emitter = Arc::new(EventEmitter::new());
        let count = Arc::new(Mutex::new(0));
        let counter = count.clone();
        let sub = emitter.listen(Arc::new(move |_e: &BridgedEvent| *counter.lock() += 1));

        emitter.emit(&event("system.events"));
        assert!(sub.unsubscribe());
        emitter.emit(&event("system.events"));

        assert_eq!(*count.lock(), 1);
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn test_unsubscribe_after_emitter_dropped() {
        let emitter = Arc::new(EventEmitter::new());
        let sub = emitter.listen(Arc::new(|_e: &BridgedEvent| {}));
        drop(emitter);
        assert!(!sub.unsubscribe());
    }
}
