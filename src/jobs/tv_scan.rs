//! TV scan pass
//!
//! Snapshot the TV section, purge shows that left it, then reconcile each
//! show against its canonical episode list.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info, warn};

use super::{PassOutcome, ScanDeps, ScanJob};
use crate::catalog::{
    Completeness, EpisodeKey, MediaKind, ShowDiff, diff_episodes, purge, start_of_today,
};
use crate::db::{OwnedEpisode, UpsertEpisode, UpsertSeason, UpsertShow};
use crate::error::{Result, ScanError};
use crate::services::library::LibraryItem;
use crate::services::metadata::ShowDetail;

pub async fn run(deps: &ScanDeps, job: &ScanJob) -> Result<PassOutcome> {
    let items = deps
        .library
        .list_items(MediaKind::Tv)
        .await
        .map_err(|e| ScanError::unavailable("plex", e))?;

    let total = items.len();
    job.set_total(total);
    info!(total, "Fetched TV library snapshot");

    let purged = purge::purge_stale(&deps.db, MediaKind::Tv, items.iter().map(|i| i.title.as_str()))
        .await?;
    if !purged.is_empty() {
        info!(count = purged.len(), "Purged shows no longer in the library");
    }

    let mut processed = 0;
    for (index, item) in items.iter().enumerate() {
        if job.should_stop() {
            return Ok(PassOutcome {
                processed,
                total,
                stopped: true,
            });
        }
        if index > 0 {
            deps.pause_between_items().await;
        }

        job.begin_item(&item.title);
        let diff = reconcile_show(deps, item, None).await?;
        debug!(
            title = %item.title,
            aired_missing = diff.aired_missing.len(),
            future_missing = diff.future_missing.len(),
            status = %diff.display_status,
            "Show reconciled"
        );

        processed += 1;
        job.item_done();
    }

    Ok(PassOutcome {
        processed,
        total,
        stopped: false,
    })
}

/// Resolve, fetch, diff and persist one show. Used by the scan and by the
/// manual re-match, which supplies `tmdb_override`.
///
/// Only persistence failures are errors; an unreachable or empty metadata
/// source records the show as Unknown.
pub async fn reconcile_show(
    deps: &ScanDeps,
    item: &LibraryItem,
    tmdb_override: Option<i64>,
) -> Result<ShowDiff> {
    let owned: Vec<OwnedEpisode> = item
        .children
        .iter()
        .map(|ep| OwnedEpisode {
            season_number: ep.season_number,
            episode_number: ep.episode_number,
            resolution: ep.resolution.clone(),
            file_path: ep.file_path.clone(),
        })
        .collect();

    let tmdb_id = match tmdb_override.or(item.tagged_id) {
        Some(id) => Some(id),
        None => match deps.metadata.resolve_id(&item.title, item.year, MediaKind::Tv).await {
            Ok(id) => id,
            Err(e) => {
                let err = ScanError::unavailable("tmdb", e);
                warn!(title = %item.title, error = %err, "Show lookup failed");
                None
            }
        },
    };

    let Some(tmdb_id) = tmdb_id else {
        let err = ScanError::ResolutionMiss(item.title.clone());
        warn!(title = %item.title, error = %err, "Recording show as Unknown");
        return save_unknown(deps, item, None, &owned).await;
    };

    let detail = match deps.metadata.fetch_show(tmdb_id).await {
        Ok(detail) => detail,
        Err(e) => {
            let err = ScanError::unavailable("tmdb", e);
            warn!(title = %item.title, tmdb_id, error = %err, "Show detail unavailable");
            return save_unknown(deps, item, Some(tmdb_id), &owned).await;
        }
    };

    let seasons = fetch_seasons(deps, &detail).await;
    if seasons.is_empty() && detail.season_count > 0 {
        warn!(title = %item.title, tmdb_id, "No season could be fetched");
        return save_unknown(deps, item, Some(tmdb_id), &owned).await;
    }

    let canonical: BTreeMap<EpisodeKey, Option<String>> = seasons
        .iter()
        .flat_map(|season| {
            season.episodes.iter().map(move |ep| {
                (
                    EpisodeKey::new(season.season_number, ep.episode_number),
                    ep.air_date.clone(),
                )
            })
        })
        .collect();
    let owned_keys: HashSet<EpisodeKey> = item.children.iter().map(|ep| ep.key()).collect();

    let diff = diff_episodes(&canonical, &owned_keys, detail.status.as_deref(), start_of_today());

    let show = UpsertShow {
        title: item.title.clone(),
        tmdb_id: Some(detail.id),
        poster_url: detail.poster_url.clone(),
        overview: detail.overview.clone(),
        first_air_date: detail.first_air_date.clone(),
        status: diff.completeness.to_string(),
        series_status: diff.display_status.clone(),
        number_of_seasons: Some(detail.season_count),
        number_of_episodes: Some(detail.episode_count),
        genres: detail.genres.clone(),
        vote_average: detail.vote_average,
        networks: detail.networks.clone(),
    };

    deps.db
        .shows()
        .save(&show, Some(&seasons), &owned)
        .await
        .map_err(ScanError::Persistence)?;

    Ok(diff)
}

/// Regular seasons `1..=season_count`. Specials (season 0) are not tracked.
/// A season that fails to load contributes no episodes.
async fn fetch_seasons(deps: &ScanDeps, detail: &ShowDetail) -> Vec<UpsertSeason> {
    let mut seasons = Vec::new();

    for number in 1..=detail.season_count {
        match deps.metadata.fetch_season(detail.id, number).await {
            Ok(season) => seasons.push(UpsertSeason {
                season_number: number,
                name: season.name,
                overview: season.overview,
                poster_path: season.poster_path,
                air_date: season.air_date,
                episodes: season
                    .episodes
                    .into_iter()
                    .map(|ep| UpsertEpisode {
                        episode_number: ep.episode_number,
                        name: ep.name,
                        air_date: ep.air_date,
                        overview: ep.overview,
                        still_path: ep.still_path,
                    })
                    .collect(),
            }),
            Err(e) => {
                let err = ScanError::unavailable("tmdb", e);
                warn!(show = %detail.name, season = number, error = %err, "Season unavailable");
            }
        }
    }

    seasons
}

async fn save_unknown(
    deps: &ScanDeps,
    item: &LibraryItem,
    tmdb_id: Option<i64>,
    owned: &[OwnedEpisode],
) -> Result<ShowDiff> {
    let show = UpsertShow {
        title: item.title.clone(),
        tmdb_id,
        status: Completeness::Unknown.to_string(),
        series_status: Completeness::Unknown.to_string(),
        ..Default::default()
    };

    deps.db
        .shows()
        .save(&show, None, owned)
        .await
        .map_err(ScanError::Persistence)?;

    Ok(ShowDiff::unknown())
}
