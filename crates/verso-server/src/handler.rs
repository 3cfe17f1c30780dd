use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use verso_gate::AccessContext;
use verso_history::{HistorySummary, KeepCountOutcome, SaveOutcome, SweepReport};
use verso_types::{BlobId, SaveKind, SiteId};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Optional header naming the caller in logs.
pub const CALLER_HEADER: &str = "x-verso-caller";

fn access_context(state: &AppState, site: SiteId, headers: &HeaderMap) -> AccessContext {
    let ctx = state.history.context_for(site);
    match headers.get(CALLER_HEADER).and_then(|v| v.to_str().ok()) {
        Some(caller) if !caller.is_empty() => ctx.with_caller(caller),
        _ => ctx,
    }
}

fn history_location(site: &SiteId) -> String {
    format!("/v1/sites/{site}/history")
}

/// Health check handler.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "name": "verso-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn list_sites_handler(State(state): State<AppState>) -> Json<Vec<SiteId>> {
    Json(state.history.catalog().site_ids())
}

// ---------------------------------------------------------------------------
// Owner actions
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateSiteParams {
    pub keep_count: Option<usize>,
}

/// `POST /v1/sites/:site` with the initial content as the body.
pub async fn create_site_handler(
    State(state): State<AppState>,
    Path(site): Path<SiteId>,
    Query(params): Query<CreateSiteParams>,
    body: Bytes,
) -> ServerResult<(StatusCode, Json<SaveOutcome>)> {
    let outcome = state
        .history
        .create_site(site, params.keep_count, body)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

#[derive(Debug, Deserialize)]
pub struct SaveParams {
    #[serde(default = "manual")]
    pub kind: SaveKind,
}

fn manual() -> SaveKind {
    SaveKind::Manual
}

/// `PUT /v1/sites/:site/content` with the new content as the body.
pub async fn save_handler(
    State(state): State<AppState>,
    Path(site): Path<SiteId>,
    Query(params): Query<SaveParams>,
    body: Bytes,
) -> ServerResult<Json<SaveOutcome>> {
    match params.kind {
        SaveKind::Manual | SaveKind::Autosave | SaveKind::Upload => {}
        other => {
            return Err(ServerError::InvalidRequest(format!(
                "{other} saves cannot be made directly"
            )))
        }
    }
    let outcome = state.history.save(&site, body, params.kind).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct KeepCountRequest {
    pub keep_count: usize,
}

pub async fn keep_count_handler(
    State(state): State<AppState>,
    Path(site): Path<SiteId>,
    Json(request): Json<KeepCountRequest>,
) -> ServerResult<Json<KeepCountOutcome>> {
    let outcome = state
        .history
        .set_keep_count(&site, request.keep_count)
        .await?;
    Ok(Json(outcome))
}

pub async fn sweep_orphans_handler(State(state): State<AppState>) -> Json<SweepReport> {
    Json(state.history.sweep_orphans().await)
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

pub async fn history_handler(
    State(state): State<AppState>,
    Path(site): Path<SiteId>,
    headers: HeaderMap,
) -> ServerResult<Json<HistorySummary>> {
    let ctx = access_context(&state, site, &headers);
    Ok(Json(state.history.history(&ctx).await?))
}

pub async fn view_version_handler(
    State(state): State<AppState>,
    Path((site, blob_id)): Path<(SiteId, BlobId)>,
    headers: HeaderMap,
) -> ServerResult<Html<String>> {
    let ctx = access_context(&state, site, &headers);
    let rendered = state.history.view_version(&ctx, &blob_id).await?;
    Ok(Html(rendered.html))
}

/// Streams the version; the body is never buffered whole.
pub async fn download_version_handler(
    State(state): State<AppState>,
    Path((site, blob_id)): Path<(SiteId, BlobId)>,
    headers: HeaderMap,
) -> ServerResult<Response> {
    let ctx = access_context(&state, site, &headers);
    let download = state.history.download_version(&ctx, &blob_id).await?;

    let disposition = format!("attachment; filename=\"{}\"", download.filename);
    Ok((
        [
            (header::CONTENT_TYPE, download.content_type),
            (header::CONTENT_LENGTH, download.size.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(download.stream),
    )
        .into_response())
}

pub async fn restore_version_handler(
    State(state): State<AppState>,
    Path((site, blob_id)): Path<(SiteId, BlobId)>,
    headers: HeaderMap,
) -> ServerResult<Redirect> {
    let location = history_location(&site);
    let ctx = access_context(&state, site, &headers);
    state.history.restore_version(&ctx, &blob_id).await?;
    Ok(Redirect::to(&location))
}

pub async fn discard_version_handler(
    State(state): State<AppState>,
    Path((site, blob_id)): Path<(SiteId, BlobId)>,
    headers: HeaderMap,
) -> ServerResult<Redirect> {
    let location = history_location(&site);
    let ctx = access_context(&state, site, &headers);
    state.history.discard_version(&ctx, &blob_id).await?;
    Ok(Redirect::to(&location))
}
