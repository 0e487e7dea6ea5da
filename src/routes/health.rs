use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: ServiceHealth,
}

#[derive(Serialize)]
pub struct ServiceHealth {
    pub primary_store: String,
    pub fallback_store: String,
}

/// Health check endpoint - public
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let (primary, fallback) = state.carts.health().await;

    let primary_status = match primary {
        Some(true) => "ok",
        Some(false) => "error",
        None => "disabled",
    };
    let fallback_status = if fallback { "ok" } else { "error" };

    // The fallback store is the floor: without it carts cannot persist at
    // all. A dead primary alone only degrades us.
    let status = if fallback {
        if primary == Some(false) {
            "degraded"
        } else {
            "healthy"
        }
    } else {
        "unhealthy"
    };

    let status_code = if status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            services: ServiceHealth {
                primary_store: primary_status.to_string(),
                fallback_store: fallback_status.to_string(),
            },
        }),
    )
}
