//! Episode database repository
//!
//! Episodes are written as part of a show by [`super::ShowRepository::save`];
//! this repository only reads them back.

use anyhow::Result;
use sqlx::SqlitePool;

/// Episode with its season coordinate
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EpisodeRecord {
    pub season_number: i32,
    pub episode_number: i32,
    pub name: Option<String>,
    pub air_date: Option<String>,
    pub exists_in_plex: bool,
    pub resolution: Option<String>,
    pub file_path: Option<String>,
}

/// Canonical episode the library does not have
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MissingEpisodeRecord {
    pub season_number: i32,
    pub episode_number: i32,
    pub name: Option<String>,
    pub air_date: Option<String>,
}

pub struct EpisodeRepository {
    pool: SqlitePool,
}

impl EpisodeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Every stored episode of a show, ordered by season and episode
    pub async fn list_for_show(&self, show_id: i64) -> Result<Vec<EpisodeRecord>> {
        let records = sqlx::query_as::<_, EpisodeRecord>(
            r#"
            SELECT se.season_number, e.episode_number, e.name, e.air_date,
                   e.exists_in_plex, e.resolution, e.file_path
            FROM episodes e
            JOIN seasons se ON se.id = e.season_id
            WHERE se.show_id = ?
            ORDER BY se.season_number, e.episode_number
            "#,
        )
        .bind(show_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Episodes of a show not present in the library
    pub async fn list_missing(&self, show_id: i64) -> Result<Vec<MissingEpisodeRecord>> {
        let records = sqlx::query_as::<_, MissingEpisodeRecord>(
            r#"
            SELECT se.season_number, e.episode_number, e.name, e.air_date
            FROM episodes e
            JOIN seasons se ON se.id = e.season_id
            WHERE se.show_id = ? AND e.exists_in_plex = 0
            ORDER BY se.season_number, e.episode_number
            "#,
        )
        .bind(show_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
