//! Movie scan pass
//!
//! Snapshot the movie section, purge movies that left it, file each owned
//! movie into its collection and record the collection members still
//! missing.

use tracing::{debug, info, warn};

use super::{PassOutcome, ScanDeps, ScanJob};
use crate::catalog::{CollectionKey, CollectionTracker, MediaKind, purge};
use crate::db::{UpsertCollection, UpsertMissingMovie, UpsertMovie};
use crate::error::{Result, ScanError};
use crate::services::library::LibraryItem;

pub async fn run(deps: &ScanDeps, job: &ScanJob) -> Result<PassOutcome> {
    let items = deps
        .library
        .list_items(MediaKind::Movie)
        .await
        .map_err(|e| ScanError::unavailable("plex", e))?;

    let total = items.len();
    job.set_total(total);
    info!(total, "Fetched movie library snapshot");

    let purged =
        purge::purge_stale(&deps.db, MediaKind::Movie, items.iter().map(|i| i.title.as_str()))
            .await?;
    if !purged.is_empty() {
        info!(count = purged.len(), "Purged movies no longer in the library");
    }

    let catalog_ids = deps
        .db
        .movies()
        .owned_ids()
        .await
        .map_err(ScanError::Persistence)?;
    let mut tracker = CollectionTracker::new(
        items
            .iter()
            .filter_map(|item| item.tagged_id)
            .chain(catalog_ids),
    );

    let mut processed = 0;
    let mut stopped = false;
    for (index, item) in items.iter().enumerate() {
        if job.should_stop() {
            stopped = true;
            break;
        }
        if index > 0 {
            deps.pause_between_items().await;
        }

        job.begin_item(&item.title);
        reconcile_movie(deps, &mut tracker, item).await?;
        processed += 1;
        job.item_done();
    }

    // Members resolved later in the pass may have been recorded as missing
    // by an earlier movie of the same collection.
    job.set_message("Pruning collections");
    let movies = deps.db.movies();
    let pruned = movies
        .prune_owned_missing()
        .await
        .map_err(ScanError::Persistence)?;
    let orphans = movies
        .prune_orphan_collections()
        .await
        .map_err(ScanError::Persistence)?;
    debug!(pruned, orphans, collections = tracker.visited(), "Movie pass cleanup");

    Ok(PassOutcome {
        processed,
        total,
        stopped,
    })
}

/// File one owned movie. Movies are keyed by canonical id, so an item that
/// cannot be resolved is skipped.
pub async fn reconcile_movie(
    deps: &ScanDeps,
    tracker: &mut CollectionTracker,
    item: &LibraryItem,
) -> Result<()> {
    let tmdb_id = match item.tagged_id {
        Some(id) => Some(id),
        None => match deps
            .metadata
            .resolve_id(&item.title, item.year, MediaKind::Movie)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                let err = ScanError::unavailable("tmdb", e);
                warn!(title = %item.title, error = %err, "Movie lookup failed");
                None
            }
        },
    };

    let Some(tmdb_id) = tmdb_id else {
        let err = ScanError::ResolutionMiss(item.title.clone());
        warn!(title = %item.title, error = %err, "Skipping movie");
        return Ok(());
    };
    tracker.mark_owned(tmdb_id);

    let detail = match deps.metadata.fetch_movie(tmdb_id).await {
        Ok(detail) => detail,
        Err(e) => {
            let err = ScanError::unavailable("tmdb", e);
            warn!(title = %item.title, tmdb_id, error = %err, "Movie detail unavailable, skipping");
            return Ok(());
        }
    };

    let key = CollectionKey::for_movie(&detail);
    let collection = match &detail.collection {
        Some(reference) => UpsertCollection {
            tmdb_id: key.storage_id(),
            name: reference.name.clone(),
            poster_url: reference.poster_url.clone(),
        },
        None => UpsertCollection {
            tmdb_id: key.storage_id(),
            name: detail.title.clone(),
            poster_url: detail.poster_url.clone(),
        },
    };

    let movie = UpsertMovie {
        // The library title, so drift purge can match it against the snapshot
        title: item.title.clone(),
        tmdb_id,
        poster_url: detail.poster_url.clone(),
        overview: detail.overview.clone(),
        release_date: detail.release_date.clone(),
        studio: detail.studio.clone(),
    };

    let movies = deps.db.movies();
    let collection_row = movies
        .save(&movie, &collection)
        .await
        .map_err(ScanError::Persistence)?;

    let CollectionKey::Canonical(collection_id) = key else {
        debug!(title = %item.title, "Standalone movie");
        return Ok(());
    };

    let Some(members) = tracker.collection(collection_id, deps.metadata.as_ref()).await else {
        return Ok(());
    };

    for member in tracker.missing_members(&members) {
        let missing = UpsertMissingMovie {
            title: member.title.clone(),
            tmdb_id: member.id,
            poster_url: member.poster_url.clone(),
            release_date: member.release_date.clone(),
        };
        let inserted = movies
            .insert_missing(collection_row, &missing)
            .await
            .map_err(ScanError::Persistence)?;
        if inserted {
            debug!(collection = %members.name, missing = %member.title, "Recorded missing movie");
        }
    }

    Ok(())
}
