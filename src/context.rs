//! Explicit adapter/bridge lifecycle
//!
//! A [`Registry`] owns the adapter and bridge for the lifetime of the
//! process. It is created empty, filled once by [`Registry::init`] and
//! emptied by [`Registry::shutdown`]; accessors fail until `init` succeeds.

use crate::adapter::LifecycleAdapter;
use crate::bridge::EventBridge;
use crate::bus::MessageBus;
use crate::config::ClawBridgeConfig;
use crate::error::{Error, Result};
use crate::platform::PlatformClient;
use crate::webhook::WebhookDelivery;
use parking_lot::RwLock;
use std::sync::Arc;

/// Adapter and bridge built from one configuration
pub struct BridgeContext {
    pub adapter: Arc<LifecycleAdapter>,
    pub bridge: EventBridge,
}

/// Holder for the process-wide [`BridgeContext`]
#[derive(Default)]
pub struct Registry {
    context: RwLock<Option<Arc<BridgeContext>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config, build the adapter and bridge, start the bridge.
    ///
    /// Fails with [`Error::InitializationFailed`] when already initialized.
    pub fn init(
        &self,
        config: &ClawBridgeConfig,
        platform: Arc<dyn PlatformClient>,
        bus: Arc<dyn MessageBus>,
    ) -> Result<Arc<BridgeContext>> {
        config.validate()?;
        let bridge = EventBridge::from_config(bus.clone(), config.bridge.clone());
        self.install(LifecycleAdapter::new(platform, bus, &config.adapter), bridge)
    }

    /// Like [`Registry::init`] with an explicit bridge webhook
    pub fn init_with_webhook(
        &self,
        config: &ClawBridgeConfig,
        platform: Arc<dyn PlatformClient>,
        bus: Arc<dyn MessageBus>,
        bridge_webhook: Arc<dyn WebhookDelivery>,
    ) -> Result<Arc<BridgeContext>> {
        config.validate()?;
        let bridge = EventBridge::new(bus.clone(), bridge_webhook, config.bridge.clone());
        self.install(LifecycleAdapter::new(platform, bus, &config.adapter), bridge)
    }

    fn install(&self, adapter: LifecycleAdapter, bridge: EventBridge) -> Result<Arc<BridgeContext>> {
        let mut slot = self.context.write();
        if slot.is_some() {
            return Err(Error::InitializationFailed(
                "registry is already initialized".to_string(),
            ));
        }

        bridge.start()?;
        let context = Arc::new(BridgeContext {
            adapter: Arc::new(adapter),
            bridge,
        });
        *slot = Some(context.clone());

        tracing::info!("Bridge context initialized");
        Ok(context)
    }

    pub fn is_initialized(&self) -> bool {
        self.context.read().is_some()
    }

    pub fn context(&self) -> Result<Arc<BridgeContext>> {
        self.context.read().clone().ok_or_else(|| {
            Error::InitializationFailed("registry used before init".to_string())
        })
    }

    pub fn adapter(&self) -> Result<Arc<LifecycleAdapter>> {
        Ok(self.context()?.adapter.clone())
    }

    pub fn bridge(&self) -> Result<EventBridge> {
        Ok(self.context()?.bridge.clone())
    }

    /// Dispose the adapter and stop the bridge. Returns adapter teardown
    /// warnings; a no-op when not initialized.
    pub async fn shutdown(&self) -> Vec<String> {
        let taken = self.context.write().take();
        let context = match taken {
            Some(context) => context,
            None => return Vec::new(),
        };

        let warnings = context.adapter.dispose().await;
        context.bridge.stop().await;

        tracing::info!(warnings = warnings.len(), "Bridge context shut down");
        warnings
    }
}
