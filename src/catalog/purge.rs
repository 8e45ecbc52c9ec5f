//! Drift purge
//!
//! Catalog titles that are no longer in the live library snapshot are
//! deleted before a pass processes any item. Runs once per pass, and only
//! against a snapshot that was fetched successfully.

use std::collections::HashSet;

use tracing::info;

use super::MediaKind;
use crate::db::Database;
use crate::error::{Result, ScanError};

/// Stored titles absent from the live set, in stored order
pub fn stale_titles<'a, I>(stored: &[String], live: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let live: HashSet<&str> = live.into_iter().collect();
    stored
        .iter()
        .filter(|title| !live.contains(title.as_str()))
        .cloned()
        .collect()
}

/// Delete every catalog entry of `kind` whose title left the library.
/// Returns the purged titles.
pub async fn purge_stale<'a, I>(db: &Database, kind: MediaKind, live: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let stored = match kind {
        MediaKind::Tv => db.shows().list_titles().await,
        MediaKind::Movie => db.movies().list_titles().await,
    }
    .map_err(ScanError::Persistence)?;

    let stale = stale_titles(&stored, live);

    for title in &stale {
        match kind {
            MediaKind::Tv => {
                db.shows().purge(title).await.map_err(ScanError::Persistence)?;
            }
            MediaKind::Movie => {
                db.movies().purge_title(title).await.map_err(ScanError::Persistence)?;
            }
        }
        info!(kind = %kind, title = %title, "Purged catalog entry no longer in library");
    }

    Ok(stale)
}
