//! API route handlers
//!
//! Read-only views for operators and the dispatcher dashboard:
//! - Liveness and collaborator mode
//! - Session, frame and escalation counters plus per-context state
//! - Recent escalation outcomes
//! - Effective configuration

use axum::extract::{Query, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::envelope::{ApiErrorResponse, ApiResponse};
use crate::pipeline::PipelineCoordinator;

/// Default number of log entries returned by `/escalations`.
const DEFAULT_ESCALATION_LIMIT: usize = 50;

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub coordinator: Arc<PipelineCoordinator>,
}

impl ApiState {
    pub fn new(coordinator: Arc<PipelineCoordinator>) -> Self {
        Self { coordinator }
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub degraded: bool,
}

/// GET /health
pub async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let status = state.coordinator.status();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        degraded: status.capabilities.degraded,
    })
}

/// GET /api/v1/status
pub async fn get_status(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.coordinator.status())
}

#[derive(Debug, Deserialize)]
pub struct EscalationQuery {
    pub limit: Option<usize>,
}

/// GET /api/v1/escalations?limit=N
pub async fn get_escalations(
    State(state): State<ApiState>,
    Query(query): Query<EscalationQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(DEFAULT_ESCALATION_LIMIT);
    if limit == 0 {
        return ApiErrorResponse::bad_request("limit must be > 0");
    }
    ApiResponse::ok(state.coordinator.escalation().log().recent(limit))
}

/// GET /api/v1/config
pub async fn get_config(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.coordinator.config())
}
