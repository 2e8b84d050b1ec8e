//! WebSocket channel for the dashboard
//!
//! Sends one greeting on connect, then drains client frames until close.
//! Nothing is pushed after the greeting.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct Greeting {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub message: &'static str,
    pub timestamp: DateTime<Utc>,
}

impl Greeting {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: "connection",
            message: "Connected to Situational Awareness system",
            timestamp,
        }
    }
}

pub async fn ws_handler(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(handle_socket)
}

async fn handle_socket(mut socket: WebSocket) {
    let id = Uuid::new_v4();
    info!(%id, "websocket client connected");

    match serde_json::to_string(&Greeting::new(Utc::now())) {
        Ok(text) => {
            if let Err(e) = socket.send(Message::Text(text)).await {
                warn!(%id, error = %e, "failed to send greeting");
                return;
            }
        }
        Err(e) => warn!(%id, error = %e, "failed to encode greeting"),
    }

    while let Some(frame) = socket.recv().await {
        match frame {
            Ok(Message::Close(_)) => break,
            Ok(Message::Text(text)) => debug!(%id, len = text.len(), "ignoring client text frame"),
            Ok(_) => {}
            Err(e) => {
                debug!(%id, error = %e, "websocket read error");
                break;
            }
        }
    }

    info!(%id, "websocket client disconnected");
}
