use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{services::metrics, AppState};

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Database is unreachable")
    ),
    tag = "Observability"
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let postgres_up = match state.db.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "PostgreSQL health check failed");
            metrics::record_error("health_check");
            false
        }
    };

    let status = if postgres_up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if postgres_up { "healthy" } else { "unhealthy" },
            "service": state.config.service_name,
            "version": state.config.service_version,
            "checks": {
                "postgresql": if postgres_up { "up" } else { "down" }
            }
        })),
    )
}

/// Readiness probe
#[utoipa::path(
    get,
    path = "/ready",
    responses(
        (status = 200, description = "Ready to serve traffic"),
        (status = 503, description = "Not ready")
    ),
    tag = "Observability"
)]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.db.health_check().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not_ready" })),
        ),
    }
}
