//! API Regression Tests
//!
//! In-process tests that build the Axum app via `create_app()` and exercise
//! the operator endpoints and the audio mount using `tower::ServiceExt::oneshot()`.
//! No binary spawn, no network port.

use guardian_link::api::{create_app, ApiState};
use guardian_link::collaborators::Capabilities;
use guardian_link::config::GuardianConfig;
use guardian_link::pipeline::{FramePayload, PipelineCoordinator};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

fn create_test_coordinator() -> Arc<PipelineCoordinator> {
    let mut config = GuardianConfig::default();
    config.admission.interval_ms = 0;
    Arc::new(PipelineCoordinator::new(Arc::new(config), Capabilities::offline()))
}

fn create_test_app(coordinator: &Arc<PipelineCoordinator>, audio_dir: &Path) -> Router {
    create_app(ApiState::new(Arc::clone(coordinator)), audio_dir, "/runtime_audio")
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    (status, bytes.to_vec())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, bytes) = get(app, uri).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// All operator GET endpoints should return 200.
#[tokio::test]
async fn test_get_endpoints_return_200() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = create_test_coordinator();

    for endpoint in ["/health", "/api/v1/status", "/api/v1/escalations", "/api/v1/config"] {
        let (status, _) = get(create_test_app(&coordinator, dir.path()), endpoint).await;
        assert_eq!(status, StatusCode::OK, "Endpoint {endpoint} returned {status}");
    }
}

/// v1 responses are wrapped in the `{data, meta}` envelope.
#[tokio::test]
async fn test_v1_envelope_shape() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = create_test_coordinator();
    let (_, body) = get_json(create_test_app(&coordinator, dir.path()), "/api/v1/status").await;

    assert!(body.get("data").is_some(), "missing data: {body}");
    assert_eq!(body["meta"]["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["data"]["capabilities"]["classifier"], "offline");
    assert_eq!(body["data"]["capabilities"]["degraded"], true);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = create_test_coordinator();
    let (status, _) = get(create_test_app(&coordinator, dir.path()), "/api/v1/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ws_route_requires_upgrade() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = create_test_coordinator();
    let (status, _) = get(create_test_app(&coordinator, dir.path()), "/ws/stream").await;
    assert!(status.is_client_error(), "plain GET should be rejected, got {status}");
}

#[tokio::test]
async fn test_audio_mount_serves_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("alert_test.wav"), b"RIFF0000WAVE").unwrap();
    let coordinator = create_test_coordinator();

    let (status, bytes) = get(
        create_test_app(&coordinator, dir.path()),
        "/runtime_audio/alert_test.wav",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"RIFF0000WAVE");
}

/// Stats and the dispatcher log reflect session traffic.
#[tokio::test]
async fn test_status_reflects_session_activity() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = create_test_coordinator();

    {
        let mut session = coordinator.open_session(None);
        for _ in 0..3 {
            session
                .handle_frame(FramePayload::Raw(vec![1, 2, 3]))
                .await
                .unwrap();
        }
        let (_, body) = get_json(create_test_app(&coordinator, dir.path()), "/api/v1/status").await;
        assert_eq!(body["data"]["stats"]["sessions_active"], 1);
        assert_eq!(body["data"]["stats"]["frames_admitted"], 3);
    }

    let (_, body) = get_json(create_test_app(&coordinator, dir.path()), "/api/v1/status").await;
    assert_eq!(body["data"]["stats"]["sessions_active"], 0);
    assert_eq!(body["data"]["stats"]["sessions_total"], 1);
    assert_eq!(body["data"]["contexts"][0]["key"], "default");
}
