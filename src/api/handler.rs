//! HTTP handlers for sessions, bus ingestion and bridge status

use crate::adapter::{AgentStatusReport, AgentSummary, SpawnOptions, SpawnedAgent};
use crate::bridge::{BridgeHealth, BridgeStats, HealthStatus};
use crate::bus::{MessageBus, Priority, PublishOptions};
use crate::context::Registry;
use crate::error::Error;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<Registry>,
    pub bus: Arc<dyn MessageBus>,
}

/// Create the API router
pub fn api_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/sessions", get(list_sessions))
        .route(
            "/api/v1/sessions/:key",
            post(spawn_session).get(session_status).delete(kill_session),
        )
        .route("/api/v1/sessions/:key/messages", post(send_message))
        .route("/api/v1/bus/publish", post(publish))
        .route("/api/v1/bridge/stats", get(bridge_stats))
        .route("/api/v1/bridge/health", get(bridge_health))
        .with_state(state)
}

// =============================================================================
// Errors
// =============================================================================

/// [`Error`] rendered as a JSON response
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::warn!(kind = self.0.kind(), "API request failed: {}", self.0);
        }
        error_response(status, self.0.kind(), &self.0.to_string())
    }
}

fn error_response(status: StatusCode, kind: &str, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({"error": {"kind": kind, "message": message}})),
    )
        .into_response()
}

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Deserialize)]
struct MessageRequest {
    content: String,
}

#[derive(Debug, Deserialize)]
struct KillQuery {
    #[serde(default)]
    force: bool,
}

#[derive(Debug, Deserialize)]
struct PublishRequest {
    topic: String,
    #[serde(default)]
    payload: serde_json::Value,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    priority: Priority,
}

// =============================================================================
// Session handlers
// =============================================================================

/// POST /api/v1/sessions/:key
async fn spawn_session(
    State(state): State<ApiState>,
    Path(key): Path<String>,
    Json(options): Json<SpawnOptions>,
) -> Result<(StatusCode, Json<SpawnedAgent>), ApiError> {
    let adapter = state.registry.adapter()?;
    let spawned = adapter.spawn_agent(&key, options).await?;
    Ok((StatusCode::CREATED, Json(spawned)))
}

/// POST /api/v1/sessions/:key/messages
async fn send_message(
    State(state): State<ApiState>,
    Path(key): Path<String>,
    Json(request): Json<MessageRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let adapter = state.registry.adapter()?;
    adapter.send_message(&key, &request.content).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({"status": "accepted"})),
    ))
}

/// DELETE /api/v1/sessions/:key
async fn kill_session(
    State(state): State<ApiState>,
    Path(key): Path<String>,
    Query(query): Query<KillQuery>,
) -> Result<StatusCode, ApiError> {
    let adapter = state.registry.adapter()?;
    adapter.kill_agent(&key, query.force).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/sessions/:key
async fn session_status(
    State(state): State<ApiState>,
    Path(key): Path<String>,
) -> Result<Json<AgentStatusReport>, ApiError> {
    let adapter = state.registry.adapter()?;
    Ok(Json(adapter.get_status(&key).await))
}

/// GET /api/v1/sessions
async fn list_sessions(
    State(state): State<ApiState>,
) -> Result<Json<Vec<AgentSummary>>, ApiError> {
    let adapter = state.registry.adapter()?;
    Ok(Json(adapter.list_agents().await))
}

// =============================================================================
// Bus and bridge handlers
// =============================================================================

/// POST /api/v1/bus/publish
async fn publish(State(state): State<ApiState>, Json(request): Json<PublishRequest>) -> Response {
    if request.topic.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "invalid_request", "topic is required");
    }

    let options = PublishOptions::new(
        request.source.unwrap_or_else(|| "api".to_string()),
        request.priority,
    );
    let message = state.bus.publish(&request.topic, request.payload, options);
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({"id": message.id, "topic": message.topic})),
    )
        .into_response()
}

/// GET /api/v1/bridge/stats
async fn bridge_stats(State(state): State<ApiState>) -> Result<Json<BridgeStats>, ApiError> {
    Ok(Json(state.registry.bridge()?.stats()))
}

/// GET /api/v1/bridge/health
async fn bridge_health(
    State(state): State<ApiState>,
) -> Result<(StatusCode, Json<BridgeHealth>), ApiError> {
    let health = state.registry.bridge()?.health();
    let status = match health.status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
    };
    Ok((status, Json(health)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MemoryBus;
    use crate::config::{BridgeConfig, ClawBridgeConfig};
    use crate::platform::{FailureMode, MemoryPlatform, Operation};
    use crate::webhook::testing::{settle, RecordingWebhook};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    struct TestApp {
        app: Router,
        registry: Arc<Registry>,
        platform: MemoryPlatform,
        webhook: Arc<RecordingWebhook>,
    }

    fn make_app() -> TestApp {
        let registry = Arc::new(Registry::new());
        let bus = Arc::new(MemoryBus::new());
        let platform = MemoryPlatform::new();
        let webhook = Arc::new(RecordingWebhook::new());
        let config = ClawBridgeConfig {
            bridge: BridgeConfig::new("http://127.0.0.1:9/events"),
            ..Default::default()
        };
        registry
            .init_with_webhook(&config, Arc::new(platform.clone()), bus.clone(), webhook.clone())
            .unwrap();

        let app = api_router(ApiState {
            registry: registry.clone(),
            bus,
        });
        TestApp {
            app,
            registry,
            platform,
            webhook,
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 64)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn spawn_body() -> serde_json::Value {
        serde_json::json!({"agentType": "researcher", "task": "summarize X"})
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let t = make_app();

        let resp = t
            .app
            .clone()
            .oneshot(post_json("/api/v1/sessions/sess-1", spawn_body()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let spawned = body_json(resp).await;
        assert!(spawned["agentId"].as_str().unwrap().starts_with("agent-"));
        assert_eq!(spawned["status"], "running");

        let resp = t.app.clone().oneshot(get("/api/v1/sessions")).await.unwrap();
        let list = body_json(resp).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["openclawSessionKey"], "sess-1");
        assert_eq!(list[0]["agentType"], "researcher");

        let resp = t
            .app
            .clone()
            .oneshot(get("/api/v1/sessions/sess-1"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "running");

        let resp = t
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/v1/sessions/sess-1?force=true")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = t.app.clone().oneshot(get("/api/v1/sessions")).await.unwrap();
        assert!(body_json(resp).await.as_array().unwrap().is_empty());
        assert_eq!(t.platform.swarm_count().await, 0);
    }

    #[tokio::test]
    async fn test_error_mapping() {
        let t = make_app();

        let resp = t
            .app
            .clone()
            .oneshot(post_json(
                "/api/v1/sessions/missing/messages",
                serde_json::json!({"content": "hi"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["error"]["kind"], "session_not_found");

        t.app
            .clone()
            .oneshot(post_json("/api/v1/sessions/sess-1", spawn_body()))
            .await
            .unwrap();
        let resp = t
            .app
            .clone()
            .oneshot(post_json("/api/v1/sessions/sess-1", spawn_body()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        t.platform
            .fail(Operation::CreateSwarm, FailureMode::Reject("quota".to_string()))
            .await;
        let resp = t
            .app
            .clone()
            .oneshot(post_json("/api/v1/sessions/sess-2", spawn_body()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(resp).await["error"]["kind"], "swarm_create_failed");
    }

    #[tokio::test]
    async fn test_status_of_unknown_session() {
        let t = make_app();
        let resp = t
            .app
            .oneshot(get("/api/v1/sessions/nope"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "not_found");
    }

    #[tokio::test]
    async fn test_send_message_accepted() {
        let t = make_app();
        t.app
            .clone()
            .oneshot(post_json("/api/v1/sessions/sess-1", spawn_body()))
            .await
            .unwrap();

        let resp = t
            .app
            .clone()
            .oneshot(post_json(
                "/api/v1/sessions/sess-1/messages",
                serde_json::json!({"content": "hello"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_publish_reaches_bridge() {
        let t = make_app();

        let resp = t
            .app
            .clone()
            .oneshot(post_json(
                "/api/v1/bus/publish",
                serde_json::json!({
                    "topic": "agent.a1.events",
                    "payload": {"eventType": "progress"},
                    "priority": "high"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        settle().await;

        let forwarded = t.webhook.events();
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded[0].0.event_type, "progress");
        assert_eq!(forwarded[0].0.metadata["priority"], "high");

        let resp = t
            .app
            .clone()
            .oneshot(get("/api/v1/bridge/stats"))
            .await
            .unwrap();
        let stats = body_json(resp).await;
        assert_eq!(stats["eventsReceived"], 1);
        assert_eq!(stats["eventsForwarded"], 1);
    }

    #[tokio::test]
    async fn test_publish_requires_topic() {
        let t = make_app();
        let resp = t
            .app
            .oneshot(post_json(
                "/api/v1/bus/publish",
                serde_json::json!({"topic": " "}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bridge_health_reflects_state() {
        let t = make_app();

        let resp = t
            .app
            .clone()
            .oneshot(get("/api/v1/bridge/health"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "healthy");

        t.registry.bridge().unwrap().stop().await;
        let resp = t
            .app
            .clone()
            .oneshot(get("/api/v1/bridge/health"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(resp).await["status"], "unhealthy");
    }

    #[tokio::test]
    async fn test_uninitialized_registry_is_unavailable() {
        let app = api_router(ApiState {
            registry: Arc::new(Registry::new()),
            bus: Arc::new(MemoryBus::new()),
        });
        let resp = app.oneshot(get("/api/v1/sessions")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(resp).await["error"]["kind"], "initialization_failed");
    }
}
