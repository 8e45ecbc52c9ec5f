//! TV show database repository
//!
//! A show and everything below it (seasons, episodes) is written in one
//! transaction per scan item, and purged the same way.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::SqlitePool;

use super::sqlite_helpers::{bool_to_int, json_to_vec, now_iso8601, vec_to_json};
use crate::catalog::diff::is_aired;

/// Show record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShowRecord {
    pub id: i64,
    pub title: String,
    pub tmdb_id: Option<i64>,
    pub poster_url: Option<String>,
    pub overview: Option<String>,
    pub first_air_date: Option<String>,
    /// Completeness: Unknown, Complete or Incomplete
    pub status: String,
    /// Composed display status, e.g. "Incomplete - Upcoming"
    pub series_status: String,
    pub number_of_seasons: Option<i32>,
    pub number_of_episodes: Option<i32>,
    pub genres: String,
    pub vote_average: Option<f64>,
    pub networks: String,
    pub last_updated: String,
}

impl ShowRecord {
    pub fn genres(&self) -> Vec<String> {
        json_to_vec(&self.genres)
    }
}

/// Show row with missing-episode counts, for listings
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShowSummary {
    pub id: i64,
    pub title: String,
    pub tmdb_id: Option<i64>,
    pub poster_url: Option<String>,
    pub status: String,
    pub series_status: String,
    pub number_of_seasons: Option<i32>,
    pub number_of_episodes: Option<i32>,
    pub last_updated: String,
    pub aired_missing: i64,
    pub future_missing: i64,
}

/// Show-level fields written by a scan
#[derive(Debug, Clone, Default)]
pub struct UpsertShow {
    pub title: String,
    pub tmdb_id: Option<i64>,
    pub poster_url: Option<String>,
    pub overview: Option<String>,
    pub first_air_date: Option<String>,
    pub status: String,
    pub series_status: String,
    pub number_of_seasons: Option<i32>,
    pub number_of_episodes: Option<i32>,
    pub genres: Vec<String>,
    pub vote_average: Option<f64>,
    pub networks: Vec<String>,
}

/// Canonical season with its episodes
#[derive(Debug, Clone, Default)]
pub struct UpsertSeason {
    pub season_number: i32,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub air_date: Option<String>,
    pub episodes: Vec<UpsertEpisode>,
}

/// Canonical episode. Ownership comes from the library snapshot.
#[derive(Debug, Clone, Default)]
pub struct UpsertEpisode {
    pub episode_number: i32,
    pub name: Option<String>,
    pub air_date: Option<String>,
    pub overview: Option<String>,
    pub still_path: Option<String>,
}

/// An episode file the library reports for the show
#[derive(Debug, Clone, Default)]
pub struct OwnedEpisode {
    pub season_number: i32,
    pub episode_number: i32,
    pub resolution: Option<String>,
    pub file_path: Option<String>,
}

pub struct ShowRepository {
    pool: SqlitePool,
}

impl ShowRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Titles of every show in the catalog
    pub async fn list_titles(&self) -> Result<Vec<String>> {
        let titles = sqlx::query_scalar::<_, String>("SELECT title FROM shows ORDER BY title")
            .fetch_all(&self.pool)
            .await?;

        Ok(titles)
    }

    /// Get a show by ID
    pub async fn get(&self, id: i64) -> Result<Option<ShowRecord>> {
        let record = sqlx::query_as::<_, ShowRecord>("SELECT * FROM shows WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    /// Get a show by its title
    pub async fn get_by_title(&self, title: &str) -> Result<Option<ShowRecord>> {
        let record = sqlx::query_as::<_, ShowRecord>("SELECT * FROM shows WHERE title = ?")
            .bind(title)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    /// All shows with their aired/future missing counts as of `today`.
    ///
    /// Counts are split with [`is_aired`] so the listing agrees with the
    /// per-show missing view on undated and unparseable air dates.
    pub async fn list_summaries(&self, today: NaiveDate) -> Result<Vec<ShowSummary>> {
        let mut records = sqlx::query_as::<_, ShowSummary>(
            r#"
            SELECT id, title, tmdb_id, poster_url, status, series_status,
                   number_of_seasons, number_of_episodes, last_updated,
                   0 AS aired_missing, 0 AS future_missing
            FROM shows
            ORDER BY title COLLATE NOCASE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let missing = sqlx::query_as::<_, (i64, Option<String>)>(
            r#"
            SELECT se.show_id, e.air_date
            FROM episodes e
            JOIN seasons se ON se.id = e.season_id
            WHERE e.exists_in_plex = 0
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts: HashMap<i64, (i64, i64)> = HashMap::new();
        for (show_id, air_date) in missing {
            let entry = counts.entry(show_id).or_default();
            if is_aired(air_date.as_deref(), today) {
                entry.0 += 1;
            } else {
                entry.1 += 1;
            }
        }

        for record in &mut records {
            if let Some((aired, future)) = counts.get(&record.id) {
                record.aired_missing = *aired;
                record.future_missing = *future;
            }
        }

        Ok(records)
    }

    /// Write one reconciled show in a single transaction.
    ///
    /// With `seasons` present the stored season/episode tree is brought in
    /// line with the canonical one: rows are upserted by natural key, so ids
    /// survive repeated passes, and rows the canonical set no longer has are
    /// deleted. Without it (no canonical match) the stored tree is
    /// kept. Either way every `exists_in_plex` flag of the show is cleared and
    /// then re-applied from `owned`, so files that left the library stop
    /// counting as owned.
    pub async fn save(
        &self,
        show: &UpsertShow,
        seasons: Option<&[UpsertSeason]>,
        owned: &[OwnedEpisode],
    ) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let show_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO shows (
                title, tmdb_id, poster_url, overview, first_air_date, status, series_status,
                number_of_seasons, number_of_episodes, genres, vote_average, networks, last_updated
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(title) DO UPDATE SET
                tmdb_id = COALESCE(excluded.tmdb_id, shows.tmdb_id),
                poster_url = COALESCE(excluded.poster_url, shows.poster_url),
                overview = COALESCE(excluded.overview, shows.overview),
                first_air_date = COALESCE(excluded.first_air_date, shows.first_air_date),
                status = excluded.status,
                series_status = excluded.series_status,
                number_of_seasons = COALESCE(excluded.number_of_seasons, shows.number_of_seasons),
                number_of_episodes = COALESCE(excluded.number_of_episodes, shows.number_of_episodes),
                genres = CASE WHEN excluded.genres = '[]' THEN shows.genres ELSE excluded.genres END,
                vote_average = COALESCE(excluded.vote_average, shows.vote_average),
                networks = CASE WHEN excluded.networks = '[]' THEN shows.networks ELSE excluded.networks END,
                last_updated = excluded.last_updated
            RETURNING id
            "#,
        )
        .bind(&show.title)
        .bind(show.tmdb_id)
        .bind(&show.poster_url)
        .bind(&show.overview)
        .bind(&show.first_air_date)
        .bind(&show.status)
        .bind(&show.series_status)
        .bind(show.number_of_seasons)
        .bind(show.number_of_episodes)
        .bind(vec_to_json(&show.genres))
        .bind(show.vote_average)
        .bind(vec_to_json(&show.networks))
        .bind(now_iso8601())
        .fetch_one(&mut *tx)
        .await
        .with_context(|| format!("Failed to upsert show '{}'", show.title))?;

        if let Some(seasons) = seasons {
            replace_tree(&mut tx, show_id, seasons).await?;
        }

        sqlx::query(
            r#"
            UPDATE episodes SET exists_in_plex = 0, resolution = NULL, file_path = NULL
            WHERE season_id IN (SELECT id FROM seasons WHERE show_id = ?)
            "#,
        )
        .bind(show_id)
        .execute(&mut *tx)
        .await?;

        for episode in owned {
            sqlx::query(
                r#"
                UPDATE episodes SET exists_in_plex = 1, resolution = ?, file_path = ?
                WHERE episode_number = ?
                  AND season_id = (SELECT id FROM seasons WHERE show_id = ? AND season_number = ?)
                "#,
            )
            .bind(&episode.resolution)
            .bind(&episode.file_path)
            .bind(episode.episode_number)
            .bind(show_id)
            .bind(episode.season_number)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(show_id)
    }

    /// Delete a show with its seasons and episodes. Returns false when no
    /// show has that title.
    pub async fn purge(&self, title: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let show_id = sqlx::query_scalar::<_, i64>("SELECT id FROM shows WHERE title = ?")
            .bind(title)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(show_id) = show_id else {
            return Ok(false);
        };

        delete_tree(&mut tx, show_id).await?;

        sqlx::query("DELETE FROM shows WHERE id = ?")
            .bind(show_id)
            .execute(&mut *tx)
            .await?;

        tx.commit()
            .await
            .with_context(|| format!("Failed to purge show '{}'", title))?;

        Ok(true)
    }
}

/// Upsert the canonical seasons and episodes of a show, then drop the ones
/// the canonical set no longer contains.
async fn replace_tree(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    show_id: i64,
    seasons: &[UpsertSeason],
) -> Result<()> {
    let mut season_ids = Vec::with_capacity(seasons.len());

    for season in seasons {
        let season_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO seasons (show_id, season_number, name, overview, poster_path, air_date)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(show_id, season_number) DO UPDATE SET
                name = excluded.name,
                overview = excluded.overview,
                poster_path = excluded.poster_path,
                air_date = excluded.air_date
            RETURNING id
            "#,
        )
        .bind(show_id)
        .bind(season.season_number)
        .bind(&season.name)
        .bind(&season.overview)
        .bind(&season.poster_path)
        .bind(&season.air_date)
        .fetch_one(&mut **tx)
        .await?;
        season_ids.push(season_id);

        let mut episode_numbers = Vec::with_capacity(season.episodes.len());
        for episode in &season.episodes {
            sqlx::query(
                r#"
                INSERT INTO episodes (season_id, episode_number, name, air_date, overview, still_path, exists_in_plex)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(season_id, episode_number) DO UPDATE SET
                    name = excluded.name,
                    air_date = excluded.air_date,
                    overview = excluded.overview,
                    still_path = excluded.still_path
                "#,
            )
            .bind(season_id)
            .bind(episode.episode_number)
            .bind(&episode.name)
            .bind(&episode.air_date)
            .bind(&episode.overview)
            .bind(&episode.still_path)
            .bind(bool_to_int(false))
            .execute(&mut **tx)
            .await?;
            episode_numbers.push(episode.episode_number);
        }

        sqlx::query(
            r#"
            DELETE FROM episodes
            WHERE season_id = ? AND episode_number NOT IN (SELECT value FROM json_each(?))
            "#,
        )
        .bind(season_id)
        .bind(vec_to_json(&episode_numbers))
        .execute(&mut **tx)
        .await?;
    }

    let kept = vec_to_json(&season_ids);
    sqlx::query(
        r#"
        DELETE FROM episodes WHERE season_id IN (
            SELECT id FROM seasons
            WHERE show_id = ? AND id NOT IN (SELECT value FROM json_each(?))
        )
        "#,
    )
    .bind(show_id)
    .bind(&kept)
    .execute(&mut **tx)
    .await?;

    sqlx::query("DELETE FROM seasons WHERE show_id = ? AND id NOT IN (SELECT value FROM json_each(?))")
        .bind(show_id)
        .bind(&kept)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

/// Episodes first, then seasons. The foreign keys cascade as well, but the
/// explicit order keeps the delete correct with enforcement switched off.
async fn delete_tree(tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>, show_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM episodes WHERE season_id IN (SELECT id FROM seasons WHERE show_id = ?)")
        .bind(show_id)
        .execute(&mut **tx)
        .await?;

    sqlx::query("DELETE FROM seasons WHERE show_id = ?")
        .bind(show_id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}
