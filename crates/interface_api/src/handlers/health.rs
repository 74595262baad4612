//! Liveness and readiness probes

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use core_kernel::{HealthCheckResult, HealthCheckable};

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Store probe, readiness only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<HealthCheckResult>,
}

/// Answers as long as the process serves requests
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        store: None,
    })
}

/// Ready once the application store answers its probe
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let probe = state.service.store().health_check().await;
    let (code, status) = if probe.is_healthy() {
        (StatusCode::OK, "ready")
    } else {
        tracing::warn!(
            adapter = %probe.adapter_id,
            message = ?probe.message,
            "Readiness check failed"
        );
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            store: Some(probe),
        }),
    )
}
