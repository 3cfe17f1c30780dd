use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with all verso endpoints.
///
/// Request bodies are capped at `state.max_content_bytes`.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_content_bytes;
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/sites", get(handler::list_sites_handler))
        .route("/v1/sites/:site", post(handler::create_site_handler))
        .route("/v1/sites/:site/content", put(handler::save_handler))
        .route("/v1/sites/:site/keep-count", put(handler::keep_count_handler))
        .route("/v1/sites/:site/history", get(handler::history_handler))
        .route(
            "/v1/sites/:site/versions/:blob_id",
            get(handler::view_version_handler),
        )
        .route(
            "/v1/sites/:site/versions/:blob_id/download",
            get(handler::download_version_handler),
        )
        .route(
            "/v1/sites/:site/versions/:blob_id/restore",
            post(handler::restore_version_handler),
        )
        .route(
            "/v1/sites/:site/versions/:blob_id/discard",
            post(handler::discard_version_handler),
        )
        .route("/v1/orphans/sweep", post(handler::sweep_orphans_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
