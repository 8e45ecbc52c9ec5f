//! Catalog read endpoints and the manual show re-match

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ApiResult};
use crate::AppState;
use crate::catalog::{EpisodeKey, ShowDiff, diff::is_aired, start_of_today};
use crate::db::{CollectionWithMissing, MissingEpisodeRecord, ShowSummary};

#[derive(Debug, Serialize)]
pub struct ShowResponse {
    pub id: i64,
    pub title: String,
    pub tmdb_id: Option<i64>,
    pub poster_url: Option<String>,
    pub status: String,
    pub series_status: String,
    pub number_of_seasons: Option<i32>,
    pub number_of_episodes: Option<i32>,
    pub aired_missing: i64,
    pub future_missing: i64,
    pub last_updated: String,
}

impl From<ShowSummary> for ShowResponse {
    fn from(s: ShowSummary) -> Self {
        Self {
            id: s.id,
            title: s.title,
            tmdb_id: s.tmdb_id,
            poster_url: s.poster_url,
            status: s.status,
            series_status: s.series_status,
            number_of_seasons: s.number_of_seasons,
            number_of_episodes: s.number_of_episodes,
            aired_missing: s.aired_missing,
            future_missing: s.future_missing,
            last_updated: s.last_updated,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MissingEpisode {
    pub season: i32,
    pub episode: i32,
    pub code: String,
    pub name: Option<String>,
    pub air_date: Option<String>,
}

impl From<MissingEpisodeRecord> for MissingEpisode {
    fn from(r: MissingEpisodeRecord) -> Self {
        Self {
            season: r.season_number,
            episode: r.episode_number,
            code: EpisodeKey::new(r.season_number, r.episode_number).to_string(),
            name: r.name,
            air_date: r.air_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MissingEpisodesResponse {
    pub show_id: i64,
    pub title: String,
    pub series_status: String,
    pub aired: Vec<MissingEpisode>,
    pub future: Vec<MissingEpisode>,
}

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub title: String,
    pub tmdb_id: i64,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub success: bool,
    pub title: String,
    pub status: String,
    pub series_status: String,
    pub aired_missing: Vec<String>,
    pub future_missing: Vec<String>,
}

impl MatchResponse {
    fn new(title: String, diff: ShowDiff) -> Self {
        Self {
            success: true,
            title,
            status: diff.completeness.to_string(),
            series_status: diff.display_status,
            aired_missing: diff.aired_missing.iter().map(ToString::to_string).collect(),
            future_missing: diff.future_missing.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CollectionMovie {
    pub title: String,
    pub tmdb_id: i64,
    pub poster_url: Option<String>,
    pub release_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CollectionResponse {
    pub id: String,
    pub name: String,
    pub poster_url: Option<String>,
    pub standalone: bool,
    pub owned: Vec<CollectionMovie>,
    pub missing: Vec<CollectionMovie>,
}

impl From<CollectionWithMissing> for CollectionResponse {
    fn from(c: CollectionWithMissing) -> Self {
        Self {
            standalone: c.collection.tmdb_id.starts_with("standalone-"),
            id: c.collection.tmdb_id,
            name: c.collection.name,
            poster_url: c.collection.poster_url,
            owned: c
                .owned
                .into_iter()
                .map(|m| CollectionMovie {
                    title: m.title,
                    tmdb_id: m.tmdb_id,
                    poster_url: m.poster_url,
                    release_date: m.release_date,
                })
                .collect(),
            missing: c
                .missing
                .into_iter()
                .map(|m| CollectionMovie {
                    title: m.title,
                    tmdb_id: m.tmdb_id,
                    poster_url: m.poster_url,
                    release_date: m.release_date,
                })
                .collect(),
        }
    }
}

async fn list_shows(State(state): State<AppState>) -> ApiResult<Json<Vec<ShowResponse>>> {
    let shows = state.db.shows().list_summaries(start_of_today()).await?;
    Ok(Json(shows.into_iter().map(Into::into).collect()))
}

/// Missing episodes of one show, split at the start of today
async fn missing_episodes(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MissingEpisodesResponse>> {
    let show = state
        .db
        .shows()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("show {} not found", id)))?;

    let today = start_of_today();
    let (aired, future): (Vec<_>, Vec<_>) = state
        .db
        .episodes()
        .list_missing(id)
        .await?
        .into_iter()
        .partition(|ep| is_aired(ep.air_date.as_deref(), today));

    Ok(Json(MissingEpisodesResponse {
        show_id: show.id,
        title: show.title,
        series_status: show.series_status,
        aired: aired.into_iter().map(Into::into).collect(),
        future: future.into_iter().map(Into::into).collect(),
    }))
}

async fn match_show(
    State(state): State<AppState>,
    Json(body): Json<MatchRequest>,
) -> ApiResult<Json<MatchResponse>> {
    let title = body.title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }

    let diff = state.controller.rematch_show(title, body.tmdb_id).await?;
    Ok(Json(MatchResponse::new(title.to_string(), diff)))
}

async fn list_collections(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<CollectionResponse>>> {
    let collections = state.db.movies().list_collections().await?;
    Ok(Json(collections.into_iter().map(Into::into).collect()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/shows", get(list_shows))
        .route("/shows/match", post(match_show))
        .route("/shows/{id}/missing", get(missing_episodes))
        .route("/collections", get(list_collections))
}
