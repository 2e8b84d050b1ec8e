use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use situational_data::{Domain, StoreHealth};

use crate::app::AppState;
use crate::error::ApiError;

/// Envelope for one domain. Store trouble is already folded into a degraded
/// envelope by the data service; only internal faults surface as errors.
pub async fn serve_domain(state: AppState, domain: Domain) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .data
        .fetch(domain)
        .await
        .map(Json)
        .map_err(|e| ApiError::internal(domain.failure_message(), e))
}

#[derive(Serialize)]
pub struct HealthServices {
    pub api: &'static str,
    pub database: StoreHealth,
    pub routes: &'static str,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub status: &'static str,
    pub timestamp: String,
    pub services: HealthServices,
    pub version: &'static str,
    /// Seconds since startup.
    pub uptime: f64,
}

pub async fn health(State(state): State<AppState>) -> Response {
    let database = state.data.store_health().await;
    let healthy = database == StoreHealth::Connected;

    let body = HealthResponse {
        success: true,
        status: if healthy { "healthy" } else { "partial" },
        timestamp: Utc::now().to_rfc3339(),
        services: HealthServices {
            api: "running",
            database,
            routes: "loaded",
        },
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started.elapsed().as_secs_f64(),
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::PARTIAL_CONTENT
    };
    (status, Json(body)).into_response()
}

pub async fn api_root() -> Json<serde_json::Value> {
    let mut endpoints = serde_json::Map::new();
    for domain in Domain::ALL {
        endpoints.insert(
            domain.as_str().to_string(),
            json!(format!("/api/v1{}", domain.route())),
        );
    }
    endpoints.insert("health".into(), json!("/api/health"));
    endpoints.insert("logs".into(), json!("/api/v1/logs/entry"));
    endpoints.insert("websocket".into(), json!("/ws"));

    Json(json!({
        "success": true,
        "message": "Palo Alto Situational Awareness API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": endpoints,
        "documentation": "https://github.com/iannucci/situational-awareness",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
