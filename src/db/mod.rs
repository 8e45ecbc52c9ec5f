//! Database connection and operations

pub mod episodes;
pub mod movies;
pub mod sqlite_helpers;
pub mod tv_shows;

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub use episodes::{EpisodeRecord, EpisodeRepository, MissingEpisodeRecord};
pub use movies::{
    CollectionRecord, CollectionWithMissing, MissingMovieRecord, MovieRecord, MovieRepository,
    UpsertCollection, UpsertMissingMovie, UpsertMovie,
};
pub use tv_shows::{
    OwnedEpisode, ShowRecord, ShowRepository, ShowSummary, UpsertEpisode, UpsertSeason, UpsertShow,
};

/// Database wrapper providing connection pool access
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database wrapper from an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the maximum connection pool size from environment or default
    fn get_max_connections() -> u32 {
        std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5)
    }

    /// Open (creating if needed) the database file and its parent directory
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid DATABASE_URL: {}", url))?
            .create_if_missing(true)
            .foreign_keys(true);

        if let Some(parent) = options.get_filename().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory {}", parent.display())
            })?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(Self::get_max_connections())
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .context("Failed to open SQLite database")?;

        Ok(Self { pool })
    }

    /// Private in-memory database. One connection that never recycles, so the
    /// schema lives as long as the pool.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory SQLite database")?;

        Ok(Self { pool })
    }

    /// Apply embedded migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Cheap readiness probe
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Get a show repository
    pub fn shows(&self) -> ShowRepository {
        ShowRepository::new(self.pool.clone())
    }

    /// Get an episode repository
    pub fn episodes(&self) -> EpisodeRepository {
        EpisodeRepository::new(self.pool.clone())
    }

    /// Get a movies repository
    pub fn movies(&self) -> MovieRepository {
        MovieRepository::new(self.pool.clone())
    }
}
