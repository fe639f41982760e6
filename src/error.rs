//! ClawBridge error types

use thiserror::Error;

/// ClawBridge error type
#[derive(Error, Debug)]
pub enum Error {
    /// The platform refused or failed to create the hosting swarm
    #[error("Failed to create swarm for session {session_key}: {details}")]
    SwarmCreateFailed {
        session_key: String,
        details: String,
    },

    /// The platform failed to spawn the agent (the swarm has been torn down)
    #[error("Failed to spawn agent for session {session_key} in swarm {swarm_id}: {details}")]
    AgentSpawnFailed {
        session_key: String,
        swarm_id: String,
        details: String,
    },

    /// No agent is mapped to the session
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// The session already has an agent mapped
    #[error("Session {session_key} already has active agent {agent_id}")]
    SessionAlreadyActive {
        session_key: String,
        agent_id: String,
    },

    /// Registry used before `init` or initialized twice
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// Platform API transport error
    #[error("Platform error: {0}")]
    Platform(String),

    /// Webhook delivery error
    #[error("Webhook delivery failed{}: {message}", status_suffix(.status))]
    Webhook {
        status: Option<u16>,
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Stable, machine-readable discriminant for API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SwarmCreateFailed { .. } => "swarm_create_failed",
            Self::AgentSpawnFailed { .. } => "agent_spawn_failed",
            Self::SessionNotFound(_) => "session_not_found",
            Self::SessionAlreadyActive { .. } => "session_already_active",
            Self::InitializationFailed(_) => "initialization_failed",
            Self::Platform(_) => "platform_error",
            Self::Webhook { .. } => "webhook_error",
            Self::Config(_) => "config_error",
            Self::Io(_) => "io_error",
            Self::Serialization(_) => "serialization_error",
            Self::Toml(_) => "toml_error",
            Self::Http(_) => "http_error",
        }
    }

    /// HTTP-style status code for surfacing command-path failures.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::SessionNotFound(_) => 404,
            Self::SessionAlreadyActive { .. } => 409,
            Self::SwarmCreateFailed { .. }
            | Self::AgentSpawnFailed { .. }
            | Self::Platform(_)
            | Self::Webhook { .. }
            | Self::Http(_) => 502,
            Self::InitializationFailed(_) => 503,
            Self::Config(_) | Self::Toml(_) => 400,
            Self::Io(_) | Self::Serialization(_) => 500,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

/// Result type alias for ClawBridge operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::SessionNotFound("s".into()).status_code(), 404);
        assert_eq!(
            Error::SessionAlreadyActive {
                session_key: "s".into(),
                agent_id: "a".into()
            }
            .status_code(),
            409
        );
        assert_eq!(
            Error::InitializationFailed("not initialized".into()).status_code(),
            503
        );
        assert_eq!(Error::Config("bad".into()).status_code(), 400);
    }

    #[test]
    fn test_kind_and_message() {
        let err = Error::AgentSpawnFailed {
            session_key: "sess-1".into(),
            swarm_id: "swarm-1".into(),
            details: "quota exceeded".into(),
        };
        assert_eq!(err.kind(), "agent_spawn_failed");
        assert_eq!(err.status_code(), 502);
        assert!(err.to_string().contains("quota exceeded"));
        assert!(err.to_string().contains("swarm-1"));
    }

    #[test]
    fn test_webhook_message_includes_status() {
        let err = Error::Webhook {
            status: Some(503),
            message: "unavailable".into(),
        };
        assert_eq!(err.to_string(), "Webhook delivery failed (503): unavailable");

        let err = Error::Webhook {
            status: None,
            message: "connection refused".into(),
        };
        assert_eq!(err.to_string(), "Webhook delivery failed: connection refused");
    }
}
