//! Scan control endpoints
//!
//! `{kind}` is `tv` or `movies`.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};

use super::error::{ApiError, ApiResult};
use crate::AppState;
use crate::catalog::MediaKind;
use crate::jobs::ScanStatus;

fn parse_kind(raw: &str) -> ApiResult<MediaKind> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("unknown scan kind '{}'", raw)))
}

/// Start a scan; answers once the job is running
async fn start_scan(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> ApiResult<(StatusCode, Json<ScanStatus>)> {
    let kind = parse_kind(&kind)?;
    state.controller.start(kind)?;
    Ok((StatusCode::ACCEPTED, Json(state.controller.status(kind))))
}

async fn stop_scan(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> ApiResult<Json<ScanStatus>> {
    let kind = parse_kind(&kind)?;
    state.controller.request_stop(kind)?;
    Ok(Json(state.controller.status(kind)))
}

async fn scan_status(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> ApiResult<Json<ScanStatus>> {
    let kind = parse_kind(&kind)?;
    Ok(Json(state.controller.status(kind)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/scans/{kind}", post(start_scan).get(scan_status))
        .route("/scans/{kind}/stop", post(stop_scan))
}
