//! Remote log relay
//!
//! The dashboard posts its own log lines here so they land in the server log
//! under the `client` target.

use axum::{routing::post, Json, Router};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct ClientLogEntry {
    pub level: Option<String>,
    pub message: String,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClientLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl ClientLevel {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("error") => Self::Error,
            Some("warn") | Some("warning") => Self::Warn,
            Some("debug") => Self::Debug,
            _ => Self::Info,
        }
    }
}

async fn log_entry(Json(entry): Json<ClientLogEntry>) -> Json<serde_json::Value> {
    let sent_at = entry.timestamp.as_deref().unwrap_or("-");
    match ClientLevel::parse(entry.level.as_deref()) {
        ClientLevel::Error => tracing::error!(target: "client", sent_at, "{}", entry.message),
        ClientLevel::Warn => tracing::warn!(target: "client", sent_at, "{}", entry.message),
        ClientLevel::Info => tracing::info!(target: "client", sent_at, "{}", entry.message),
        ClientLevel::Debug => tracing::debug!(target: "client", sent_at, "{}", entry.message),
    }

    Json(json!({ "success": true, "data": [], "note": "OK" }))
}

pub fn log_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/api/v1/logs/entry", post(log_entry))
}
