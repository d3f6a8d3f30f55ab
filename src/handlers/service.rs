// handlers/service.rs - GET / and GET /health

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - service name, version and route map
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "Job Board API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "home": "/ (public)",
            "health": "/health (public)",
            "users": "/api/users/* (register, login and forgot-password public; rest protected)",
            "jobs": "/api/jobs[/:id] (list and show public; rest protected)",
            "chat": "/api/chat/* (protected)",
            "reviews": "/api/reviews/* (protected)",
            "uploads": "POST /api/uploads (protected), GET /uploads/:file (public)",
            "realtime": "/ws (WebSocket: joinRoom, sendMessage, receiveMessage)",
        }
    }))
}

/// GET /health - liveness with a store ping
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok",
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unavailable",
                })),
            )
        }
    }
}
