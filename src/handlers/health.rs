use axum::{response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use serde_json::json;

use crate::AppState;

pub const SERVICE_NAME: &str = "Stateset Forecast Service";

/// Liveness response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub service: &'static str,
}

/// Basic liveness probe. Does not contact the backend.
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
        service: SERVICE_NAME,
    })
}

/// Service banner with the endpoint map
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "forecast": "/forecast",
            "store_forecast": "/forecast/store"
        }
    }))
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
}
