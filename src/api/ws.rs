//! Frame stream over WebSocket.
//!
//! Text messages carry base64 frames (optionally `data:` URLs) or the JSON
//! keepalive `{"type":"ping"}`; binary messages carry raw image bytes. Each
//! admitted frame produces one JSON [`FrameResponse`](crate::types::FrameResponse).

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::envelope::ApiErrorResponse;
use super::handlers::ApiState;
use crate::config::defaults::MAX_DEVICE_ID_LEN;
use crate::pipeline::{is_valid_device_id, FramePayload, PipelineCoordinator};

const PONG: &str = r#"{"type":"pong"}"#;

#[derive(Debug, Default, Deserialize)]
pub struct StreamParams {
    /// Device identifier; selects the aggregation context in `per_device` scope.
    pub device: Option<String>,
}

#[derive(Deserialize)]
struct ControlMessage {
    #[serde(rename = "type")]
    kind: String,
}

/// True for the JSON keepalive message.
pub fn is_ping(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with('{')
        && serde_json::from_str::<ControlMessage>(trimmed).is_ok_and(|m| m.kind == "ping")
}

/// GET /ws/stream?device=ID
pub async fn stream_handler(
    State(state): State<ApiState>,
    Query(params): Query<StreamParams>,
    ws: WebSocketUpgrade,
) -> Response {
    if let Some(device) = params.device.as_deref() {
        if !is_valid_device_id(device.trim()) {
            return ApiErrorResponse::bad_request(format!(
                "device must be 1-{MAX_DEVICE_ID_LEN} characters of [A-Za-z0-9-_.:]"
            ));
        }
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state.coordinator, params.device))
}

async fn handle_socket(
    mut socket: WebSocket,
    coordinator: Arc<PipelineCoordinator>,
    device: Option<String>,
) {
    let mut session = coordinator.open_session(device.as_deref());

    while let Some(message) = socket.recv().await {
        let message = match message {
            Ok(m) => m,
            Err(e) => {
                info!(session = %session.id(), error = %e, "WebSocket receive failed");
                break;
            }
        };

        let payload = match message {
            Message::Text(text) if is_ping(&text) => {
                if socket.send(Message::Text(PONG.to_string())).await.is_err() {
                    break;
                }
                continue;
            }
            Message::Text(text) => FramePayload::Encoded(text),
            Message::Binary(bytes) => FramePayload::Raw(bytes),
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        let Some(response) = session.handle_frame(payload).await else {
            continue;
        };

        match serde_json::to_string(&response) {
            Ok(json) => {
                if socket.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
            Err(e) => warn!(session = %session.id(), error = %e, "Failed to serialize frame response"),
        }
    }

    debug!(session = %session.id(), "WebSocket loop ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_detection() {
        assert!(is_ping(r#"{"type":"ping"}"#));
        assert!(is_ping(r#"  {"type": "ping", "ts": 1}"#));
        assert!(!is_ping(r#"{"type":"frame"}"#));
        assert!(!is_ping("aGVsbG8="));
        assert!(!is_ping("data:image/jpeg;base64,aGVsbG8="));
    }
}
