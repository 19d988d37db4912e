//! REST and WebSocket API using Axum
//!
//! - `/ws/stream` frame sessions
//! - `/api/v1` operator endpoints wrapped in a consistent envelope
//! - `/health` liveness
//! - `/runtime_audio/*` synthesized alert audio

pub mod envelope;
pub mod handlers;
mod routes;
pub mod ws;

pub use handlers::ApiState;

use axum::http::{header, Method};
use axum::Router;
use std::path::Path;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Build a CORS layer that is restrictive by default (same-origin only).
///
/// Set `GUARDIAN_CORS_ORIGINS` to a comma-separated list of allowed origins
/// (e.g. `http://localhost:5173` for a local dashboard dev server).
fn build_cors_layer() -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);
    match std::env::var("GUARDIAN_CORS_ORIGINS") {
        Ok(origins) => {
            let allowed: Vec<_> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            base.allow_origin(allowed)
        }
        Err(_) => base,
    }
}

/// Create the complete application router.
pub fn create_app(state: ApiState, audio_dir: &Path, audio_url_prefix: &str) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes(state.clone()))
        .merge(routes::root_routes(state))
        .nest_service(audio_url_prefix, ServeDir::new(audio_dir))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}
