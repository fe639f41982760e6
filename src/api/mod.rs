//! Control API
//!
//! ## Endpoint Map
//!
//! | Route                               | Method | Description                 |
//! |-------------------------------------|--------|-----------------------------|
//! | `/health`                           | GET    | Liveness probe              |
//! | `/api/v1/sessions`                  | GET    | List mapped sessions        |
//! | `/api/v1/sessions/:key`             | POST   | Spawn an agent for session  |
//! | `/api/v1/sessions/:key`             | GET    | Agent status                |
//! | `/api/v1/sessions/:key`             | DELETE | Kill agent (`?force=true`)  |
//! | `/api/v1/sessions/:key/messages`    | POST   | Send a message to the agent |
//! | `/api/v1/bus/publish`               | POST   | Publish onto the bus        |
//! | `/api/v1/bridge/stats`              | GET    | Bridge counters             |
//! | `/api/v1/bridge/health`             | GET    | Bridge health (503 if down) |
//!
//! Errors are returned as `{"error": {"kind": ..., "message": ...}}` with
//! the status code of the underlying [`Error`](crate::Error).

mod handler;

pub use handler::{api_router, ApiError, ApiState};

use axum::{response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

/// Build the complete HTTP application
pub fn build_app(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(api_router(state))
        .layer(TraceLayer::new_for_http())
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
