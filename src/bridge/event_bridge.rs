//! Bus → webhook event bridge

use super::stats::{BridgeHealth, BridgeStats, Counters, HealthStatus};
use crate::bus::{BusHandler, BusMessage, MessageBus, SubscriptionHandle, CATCH_ALL};
use crate::config::BridgeConfig;
use crate::error::{Error, Result};
use crate::events::{self, BridgedEvent, EventEmitter, EventListener, LocalSubscription};
use crate::webhook::{HttpWebhook, WebhookDelivery};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Topic patterns the bridge subscribes to while running
pub const BRIDGE_PATTERNS: [&str; 4] = ["agent.*.events", "swarm.*.events", "system.events", CATCH_ALL];

/// Number of recent message ids remembered for de-duplication
const DEDUP_WINDOW: usize = 1024;

#[derive(Default)]
struct BridgeState {
    running: bool,
    subscriptions: Vec<SubscriptionHandle>,
    timer: Option<JoinHandle<()>>,
}

struct Inner {
    bus: Arc<dyn MessageBus>,
    webhook: Arc<dyn WebhookDelivery>,
    config: BridgeConfig,
    state: Mutex<BridgeState>,
    buffer: Mutex<Vec<BridgedEvent>>,
    recent: Mutex<RecentIds>,
    counters: Counters,
    emitter: Arc<EventEmitter>,
}

/// Forwards platform bus events to an external webhook.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct EventBridge {
    inner: Arc<Inner>,
}

impl EventBridge {
    /// Create a stopped bridge delivering through `webhook`
    pub fn new(
        bus: Arc<dyn MessageBus>,
        webhook: Arc<dyn WebhookDelivery>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                bus,
                webhook,
                config,
                state: Mutex::new(BridgeState::default()),
                buffer: Mutex::new(Vec::new()),
                recent: Mutex::new(RecentIds::new(DEDUP_WINDOW)),
                counters: Counters::default(),
                emitter: Arc::new(EventEmitter::new()),
            }),
        }
    }

    /// Create a stopped bridge posting to `config.webhook_url`
    pub fn from_config(bus: Arc<dyn MessageBus>, config: BridgeConfig) -> Self {
        let webhook = HttpWebhook::new(
            config.webhook_url.clone(),
            config.auth_token.clone(),
            config.retry,
        );
        Self::new(bus, Arc::new(webhook), config)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Subscribe to the bridge topics and arm the flush timer when batching.
    ///
    /// Must be called from within a tokio runtime. Starting a running bridge
    /// only logs a warning.
    pub fn start(&self) -> Result<()> {
        let runtime = Handle::try_current().map_err(|e| {
            Error::InitializationFailed(format!("event bridge requires a tokio runtime: {}", e))
        })?;

        let mut state = self.inner.state.lock();
        if state.running {
            tracing::warn!("Event bridge already running");
            return Ok(());
        }

        state.subscriptions = BRIDGE_PATTERNS
            .iter()
            .map(|pattern| self.inner.bus.subscribe(pattern, self.handler(runtime.clone())))
            .collect();

        if self.inner.config.batching_enabled() {
            let interval = Duration::from_millis(self.inner.config.batch_interval_ms);
            state.timer = Some(runtime.spawn(flush_timer(Arc::downgrade(&self.inner), interval)));
        }
        state.running = true;

        tracing::info!(
            webhook_url = %self.inner.config.webhook_url,
            batch_interval_ms = self.inner.config.batch_interval_ms,
            max_batch_size = self.inner.config.max_batch_size,
            "Event bridge started"
        );
        Ok(())
    }

    /// Disarm the timer, drop the bus subscriptions and flush what is
    /// buffered. Flush failures are counted and logged, never returned.
    pub async fn stop(&self) {
        let (timer, subscriptions) = {
            let mut state = self.inner.state.lock();
            if !state.running {
                tracing::warn!("Event bridge already stopped");
                return;
            }
            state.running = false;
            (state.timer.take(), std::mem::take(&mut state.subscriptions))
        };

        if let Some(timer) = timer {
            timer.abort();
        }
        // Unsubscribe first so nothing lands in the buffer after the final flush.
        for handle in &subscriptions {
            self.inner.bus.unsubscribe(handle);
        }
        self.inner.flush().await;

        tracing::info!("Event bridge stopped");
    }

    pub async fn restart(&self) -> Result<()> {
        self.stop().await;
        self.start()
    }

    /// Deliver everything currently buffered as one batch
    pub async fn flush(&self) {
        self.inner.flush().await;
    }

    // =========================================================================
    // Local fan-out
    // =========================================================================

    /// Listen to events originating from one agent
    pub fn subscribe_to_agent(
        &self,
        agent_id: impl Into<String>,
        listener: EventListener,
    ) -> LocalSubscription {
        let agent_id = agent_id.into();
        self.listen_where(move |event| event.agent_id() == Some(agent_id.as_str()), listener)
    }

    /// Listen to events originating from one swarm
    pub fn subscribe_to_swarm(
        &self,
        swarm_id: impl Into<String>,
        listener: EventListener,
    ) -> LocalSubscription {
        let swarm_id = swarm_id.into();
        self.listen_where(move |event| event.swarm_id() == Some(swarm_id.as_str()), listener)
    }

    /// Listen to events of the given types
    pub fn subscribe_to_event_types<I, S>(&self, types: I, listener: EventListener) -> LocalSubscription
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let types: HashSet<String> = types.into_iter().map(Into::into).collect();
        self.listen_where(move |event| types.contains(&event.event_type), listener)
    }

    fn listen_where<P>(&self, predicate: P, listener: EventListener) -> LocalSubscription
    where
        P: Fn(&BridgedEvent) -> bool + Send + Sync + 'static,
    {
        self.inner.emitter.listen(Arc::new(move |event: &BridgedEvent| {
            if predicate(event) {
                listener(event);
            }
        }))
    }

    // =========================================================================
    // Observability
    // =========================================================================

    pub fn is_running(&self) -> bool {
        self.inner.state.lock().running
    }

    /// Events waiting for the next flush
    pub fn buffered_len(&self) -> usize {
        self.inner.buffer.lock().len()
    }

    pub fn stats(&self) -> BridgeStats {
        let (running, subscriptions) = {
            let state = self.inner.state.lock();
            (state.running, state.subscriptions.len())
        };
        self.inner
            .counters
            .snapshot(running, self.buffered_len(), subscriptions)
    }

    pub fn health(&self) -> BridgeHealth {
        let (running, subscriptions) = {
            let state = self.inner.state.lock();
            (state.running, state.subscriptions.len())
        };
        BridgeHealth {
            status: HealthStatus::classify(running, subscriptions),
            running,
            subscriptions,
            last_event_time: self.inner.counters.last_event_time(),
        }
    }

    fn handler(&self, runtime: Handle) -> BusHandler {
        let inner = Arc::downgrade(&self.inner);
        Arc::new(move |message: &BusMessage| {
            if let Some(inner) = inner.upgrade() {
                inner.ingest(message, &runtime);
            }
        })
    }
}

impl Inner {
    fn ingest(self: &Arc<Self>, message: &BusMessage, runtime: &Handle) {
        // A publish already dispatching when `stop` ran still reaches us.
        if !self.state.lock().running {
            return;
        }
        if !self.recent.lock().insert(&message.id) {
            return;
        }
        self.counters.record_received();

        let event = events::transform_topic(message);
        self.emitter.emit(&event);

        if !self.config.allows(&event.event_type) {
            self.counters.record_filtered();
            tracing::debug!(event_type = %event.event_type, topic = %message.topic, "Event filtered");
            return;
        }

        if !self.config.batching_enabled() {
            runtime.spawn(self.clone().deliver_event(event));
            return;
        }

        // Lock order: state, then buffer. Holding state keeps `stop` from
        // flipping `running` between the check and the push.
        let full = {
            let state = self.state.lock();
            if !state.running {
                tracing::debug!(event_type = %event.event_type, "Event dropped, bridge stopped");
                return;
            }
            let mut buffer = self.buffer.lock();
            buffer.push(event);
            if buffer.len() >= self.config.max_batch_size {
                Some(std::mem::take(&mut *buffer))
            } else {
                None
            }
        };
        if let Some(batch) = full {
            runtime.spawn(self.clone().deliver_batch(batch));
        }
    }

    async fn flush(self: &Arc<Self>) {
        if let Some(batch) = self.take_batch() {
            self.clone().deliver_batch(batch).await;
        }
    }

    /// Snapshot and clear the buffer; `None` when empty
    fn take_batch(&self) -> Option<Vec<BridgedEvent>> {
        let batch = std::mem::take(&mut *self.buffer.lock());
        (!batch.is_empty()).then_some(batch)
    }

    async fn deliver_event(self: Arc<Self>, event: BridgedEvent) {
        match self.webhook.send_event(&event, None).await {
            Ok(()) => self.counters.record_forwarded(1),
            Err(e) => {
                self.counters.record_failed(1);
                tracing::warn!(event_type = %event.event_type, "Failed to forward event: {}", e);
            }
        }
    }

    /// One delivery attempt per batch; failed batches are not re-queued.
    async fn deliver_batch(self: Arc<Self>, batch: Vec<BridgedEvent>) {
        let size = batch.len();
        match self.webhook.send_batch(&batch).await {
            Ok(()) => {
                self.counters.record_batch(size);
                tracing::debug!(size, "Event batch delivered");
            }
            Err(e) => {
                self.counters.record_failed(size);
                tracing::warn!(size, "Failed to deliver event batch: {}", e);
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        for handle in state.subscriptions.drain(..) {
            self.bus.unsubscribe(&handle);
        }
    }
}

/// Periodic flush. Deliveries run on their own tasks so aborting the timer
/// never cancels a batch already taken from the buffer.
async fn flush_timer(inner: Weak<Inner>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        if let Some(batch) = inner.take_batch() {
            tokio::spawn(inner.deliver_batch(batch));
        }
    }
}

/// Bounded set of recently seen message ids, oldest evicted first
struct RecentIds {
    order: VecDeque<String>,
    seen: HashSet<String>,
    capacity: usize,
}

impl RecentIds {
    fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    /// `false` if the id is already in the window
    fn insert(&mut self, id: &str) -> bool {
        if self.seen.contains(id) {
            return false;
        }
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.order.push_back(id.to_string());
        self.seen.insert(id.to_string());
        true
    }
}
