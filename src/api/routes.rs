//! API route definitions
//!
//! - /health              liveness
//! - /api/v1/status       counters, capabilities, aggregation contexts
//! - /api/v1/escalations  dispatcher log
//! - /api/v1/config       effective configuration
//! - /ws/stream           frame session (WebSocket)

use axum::{routing::get, Router};

use super::handlers::{self, ApiState};
use super::ws;

/// Create the `/api/v1` routes
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/status", get(handlers::get_status))
        .route("/escalations", get(handlers::get_escalations))
        .route("/config", get(handlers::get_config))
        .with_state(state)
}

/// Root-level routes: health and the frame stream
pub fn root_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/ws/stream", get(ws::stream_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::Capabilities;
    use crate::config::GuardianConfig;
    use crate::pipeline::PipelineCoordinator;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn create_test_state() -> ApiState {
        let config = Arc::new(GuardianConfig::default());
        ApiState::new(Arc::new(PipelineCoordinator::new(config, Capabilities::offline())))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_root_health() {
        let (status, body) = get_json(root_routes(create_test_state()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["degraded"], true);
    }

    #[tokio::test]
    async fn test_api_routes_status() {
        let (status, body) = get_json(api_routes(create_test_state()), "/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["scope"], "shared");
        assert_eq!(body["data"]["capabilities"]["reasoner"], "offline");
        assert_eq!(body["data"]["stats"]["triggers"], 0);
    }

    #[tokio::test]
    async fn test_api_routes_escalations_empty() {
        let (status, body) = get_json(api_routes(create_test_state()), "/escalations?limit=5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_api_routes_escalations_rejects_zero_limit() {
        let (status, body) = get_json(api_routes(create_test_state()), "/escalations?limit=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_api_routes_config() {
        let (status, body) = get_json(api_routes(create_test_state()), "/config").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["temporal"]["window_size"], 10);
        assert_eq!(body["data"]["escalation"]["cooldown_secs"], 30);
    }
}
