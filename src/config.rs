//! ClawBridge configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main ClawBridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClawBridgeConfig {
    /// Control API server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Platform API client configuration
    #[serde(default)]
    pub platform: PlatformConfig,

    /// Lifecycle adapter configuration
    #[serde(default)]
    pub adapter: AdapterConfig,

    /// Event bridge configuration
    #[serde(default)]
    pub bridge: BridgeConfig,
}

impl ClawBridgeConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Check the configuration for values the bridge cannot run with
    pub fn validate(&self) -> Result<()> {
        self.bridge.validate()?;

        if let Some(url) = &self.adapter.webhook_url {
            validate_url("adapter.webhook_url", url)?;
        }
        validate_url("platform.base_url", &self.platform.base_url)?;

        Ok(())
    }
}

/// Control API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 18795,
        }
    }
}

/// Platform API client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Base URL of the platform REST API
    pub base_url: String,

    /// API key sent as a bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:7373".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// Lifecycle adapter configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Webhook receiving per-agent events (disabled when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    /// Bearer token for the webhook
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Delivery retry policy
    #[serde(default)]
    pub retry: RetryPolicy,
}

/// Event bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Webhook receiving bridged events (required)
    pub webhook_url: String,

    /// Event types forwarded to the webhook (unset or empty = all)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_filter: Option<Vec<String>>,

    /// Bearer token for the webhook
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Batch flush interval in milliseconds (0 = forward immediately)
    #[serde(default)]
    pub batch_interval_ms: u64,

    /// Buffer size that triggers an immediate flush
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Delivery retry policy
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_max_batch_size() -> usize {
    100
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            event_filter: None,
            auth_token: None,
            batch_interval_ms: 0,
            max_batch_size: default_max_batch_size(),
            retry: RetryPolicy::default(),
        }
    }
}

impl BridgeConfig {
    /// Create a bridge configuration for the given webhook with defaults
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            ..Default::default()
        }
    }

    /// Whether events are buffered and flushed in batches
    pub fn batching_enabled(&self) -> bool {
        self.batch_interval_ms > 0
    }

    /// Whether an event type passes the inclusion filter
    pub fn allows(&self, event_type: &str) -> bool {
        match &self.event_filter {
            Some(filter) if !filter.is_empty() => filter.iter().any(|t| t == event_type),
            _ => true,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.webhook_url.trim().is_empty() {
            return Err(Error::Config("bridge.webhook_url is required".to_string()));
        }
        validate_url("bridge.webhook_url", &self.webhook_url)?;
        if self.max_batch_size == 0 {
            return Err(Error::Config(
                "bridge.max_batch_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Webhook delivery retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Base delay in milliseconds, doubled on every retry
    pub retry_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// Policy with a single attempt
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            retry_delay_ms: 0,
        }
    }

    /// Delay before retry number `retry` (0-based)
    pub fn delay_for(&self, retry: u32) -> std::time::Duration {
        let factor = 1u64.checked_shl(retry.min(16)).unwrap_or(u64::MAX);
        std::time::Duration::from_millis(self.retry_delay_ms.saturating_mul(factor))
    }
}

fn validate_url(field: &str, url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{} must be an http(s) URL, got '{}'",
            field, url
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_bridge_defaults() {
        let config = BridgeConfig::new("http://localhost:9000/hook");
        assert_eq!(config.batch_interval_ms, 0);
        assert_eq!(config.max_batch_size, 100);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.retry_delay_ms, 1000);
        assert!(!config.batching_enabled());
    }

    #[test]
    fn test_filter_allows() {
        let mut config = BridgeConfig::new("http://localhost/hook");
        assert!(config.allows("anything"));

        config.event_filter = Some(vec![]);
        assert!(config.allows("anything"));

        config.event_filter = Some(vec!["agent.update".to_string()]);
        assert!(config.allows("agent.update"));
        assert!(!config.allows("agent.progress"));
    }

    #[test]
    fn test_retry_delay_doubles() {
        let policy = RetryPolicy {
            max_retries: 3,
            retry_delay_ms: 100,
        };
        assert_eq!(policy.delay_for(0).as_millis(), 100);
        assert_eq!(policy.delay_for(1).as_millis(), 200);
        assert_eq!(policy.delay_for(2).as_millis(), 400);
    }

    #[test]
    fn test_validate_requires_webhook() {
        let config = ClawBridgeConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bridge.webhook_url"));

        let mut config = ClawBridgeConfig::default();
        config.bridge.webhook_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        config.bridge.webhook_url = "https://example.com/hook".to_string();
        assert!(config.validate().is_ok());

        config.bridge.max_batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_toml() {
        let config = ClawBridgeConfig::from_toml_str(
            r#"
            [bridge]
            webhook_url = "https://openclaw.example.com/events"
            event_filter = ["agent.update", "agent.complete"]
            batch_interval_ms = 500

            [bridge.retry]
            max_retries = 5
            retry_delay_ms = 250

            [adapter]
            webhook_url = "https://openclaw.example.com/sessions"
            auth_token = "secret"
            "#,
        )
        .unwrap();

        assert!(config.bridge.batching_enabled());
        assert_eq!(config.bridge.max_batch_size, 100);
        assert_eq!(config.bridge.retry.max_retries, 5);
        assert_eq!(config.adapter.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.server.port, 18795);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[bridge]\nwebhook_url = \"http://localhost:9000/hook\"\n\n[server]\nhost = \"0.0.0.0\"\nport = 8080"
        )
        .unwrap();

        let config = ClawBridgeConfig::load(file.path()).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.bridge.webhook_url, "http://localhost:9000/hook");
    }

    #[test]
    fn test_default_config_serializes() {
        let config = ClawBridgeConfig::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[bridge]"));
        assert!(toml.contains("max_batch_size = 100"));
    }
}
