//! Health check handler

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;

use core_kernel::HealthCheckable;

use crate::dto::health::HealthResponse;
use crate::AppState;

/// Health check including storage connectivity
///
/// Responds 503 when the store is unreachable.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let result = state.port.health_check().await;

    let (status, body) = if result.is_healthy() {
        (
            StatusCode::OK,
            HealthResponse {
                status: "ok",
                database: "connected",
                error: None,
                version: env!("CARGO_PKG_VERSION"),
                timestamp: Utc::now(),
            },
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            HealthResponse {
                status: "error",
                database: "disconnected",
                error: result.message,
                version: env!("CARGO_PKG_VERSION"),
                timestamp: Utc::now(),
            },
        )
    };

    (status, Json(body))
}
