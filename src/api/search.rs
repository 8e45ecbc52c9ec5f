//! Release search and download submission

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ApiResult};
use crate::AppState;
use crate::catalog::{MediaKind, OwnedTitles, is_owned};
use crate::services::Release;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub seeders: i32,
    pub size_bytes: u64,
    pub category_id: Option<u32>,
    pub kind: Option<MediaKind>,
    pub link: String,
    /// Whether the release looks like something already in the catalog
    pub owned: bool,
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub link: String,
    pub kind: MediaKind,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub success: bool,
    pub category: String,
}

async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<SearchResult>>> {
    let q = query.q.trim();
    if q.is_empty() {
        return Err(ApiError::BadRequest("query parameter 'q' is required".to_string()));
    }
    let indexer = state.indexer.as_ref().ok_or(ApiError::Unavailable("indexer"))?;

    let releases = indexer.search(q).await?;

    let movie_titles = state.db.movies().list_titles().await?;
    let show_titles = state.db.shows().list_titles().await?;
    let owned = OwnedTitles::new(movie_titles, show_titles);

    let results = releases
        .into_iter()
        .map(|release: Release| SearchResult {
            owned: is_owned(&release.title, &owned),
            kind: release
                .category_id
                .and_then(|id| state.categories.kind_for_category(id)),
            title: release.title,
            seeders: release.seeders,
            size_bytes: release.size_bytes,
            category_id: release.category_id,
            link: release.link,
        })
        .collect();

    Ok(Json(results))
}

/// Hand a release to the download client under the category for its kind
async fn submit_download(
    State(state): State<AppState>,
    Json(body): Json<DownloadRequest>,
) -> ApiResult<Json<DownloadResponse>> {
    let downloads = state
        .downloads
        .as_ref()
        .ok_or(ApiError::Unavailable("download client"))?;

    let link = body.link.trim();
    if link.is_empty() {
        return Err(ApiError::BadRequest("link is required".to_string()));
    }

    let payload = state
        .resolver
        .resolve(link)
        .await
        .map_err(|e| ApiError::BadRequest(format!("{:#}", e)))?;
    let category = state.categories.label_for(body.kind).to_string();

    downloads.submit(payload, &category).await?;

    Ok(Json(DownloadResponse {
        success: true,
        category,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search))
        .route("/downloads", post(submit_download))
}
