//! Movie, collection and missing-movie repository

use std::collections::HashMap;

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use super::sqlite_helpers::now_iso8601;

/// Movie record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MovieRecord {
    pub id: i64,
    pub title: String,
    pub tmdb_id: i64,
    pub collection_tmdb_id: Option<String>,
    pub poster_url: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub studio: Option<String>,
    pub last_updated: String,
}

/// Collection record. `tmdb_id` is the canonical id as text, or
/// `standalone-<movie id>` for a movie outside any collection.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CollectionRecord {
    pub id: i64,
    pub tmdb_id: String,
    pub name: String,
    pub poster_url: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MissingMovieRecord {
    pub id: i64,
    pub collection_id: i64,
    pub title: String,
    pub tmdb_id: i64,
    pub poster_url: Option<String>,
    pub release_date: Option<String>,
}

/// A collection with the movies owned from it and the ones still missing
#[derive(Debug, Clone)]
pub struct CollectionWithMissing {
    pub collection: CollectionRecord,
    pub owned: Vec<MovieRecord>,
    pub missing: Vec<MissingMovieRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct UpsertCollection {
    pub tmdb_id: String,
    pub name: String,
    pub poster_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpsertMovie {
    pub title: String,
    pub tmdb_id: i64,
    pub poster_url: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub studio: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpsertMissingMovie {
    pub title: String,
    pub tmdb_id: i64,
    pub poster_url: Option<String>,
    pub release_date: Option<String>,
}

pub struct MovieRepository {
    pool: SqlitePool,
}

impl MovieRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Distinct titles of every movie in the catalog
    pub async fn list_titles(&self) -> Result<Vec<String>> {
        let titles =
            sqlx::query_scalar::<_, String>("SELECT DISTINCT title FROM movies ORDER BY title")
                .fetch_all(&self.pool)
                .await?;

        Ok(titles)
    }

    /// Canonical ids of every movie in the catalog
    pub async fn owned_ids(&self) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT tmdb_id FROM movies")
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }

    /// Write a movie and its collection in one transaction. Any missing-movie
    /// row for this movie is dropped since it is now owned. Returns the
    /// collection's row id.
    pub async fn save(&self, movie: &UpsertMovie, collection: &UpsertCollection) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let collection_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO collections (tmdb_id, name, poster_url)
            VALUES (?, ?, ?)
            ON CONFLICT(tmdb_id) DO UPDATE SET
                name = excluded.name,
                poster_url = COALESCE(excluded.poster_url, collections.poster_url)
            RETURNING id
            "#,
        )
        .bind(&collection.tmdb_id)
        .bind(&collection.name)
        .bind(&collection.poster_url)
        .fetch_one(&mut *tx)
        .await
        .with_context(|| format!("Failed to upsert collection '{}'", collection.name))?;

        sqlx::query(
            r#"
            INSERT INTO movies (title, tmdb_id, collection_tmdb_id, poster_url, overview, release_date, studio, last_updated)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(tmdb_id) DO UPDATE SET
                title = excluded.title,
                collection_tmdb_id = excluded.collection_tmdb_id,
                poster_url = excluded.poster_url,
                overview = excluded.overview,
                release_date = excluded.release_date,
                studio = excluded.studio,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(&movie.title)
        .bind(movie.tmdb_id)
        .bind(&collection.tmdb_id)
        .bind(&movie.poster_url)
        .bind(&movie.overview)
        .bind(&movie.release_date)
        .bind(&movie.studio)
        .bind(now_iso8601())
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to upsert movie '{}'", movie.title))?;

        sqlx::query("DELETE FROM missing_movies WHERE tmdb_id = ?")
            .bind(movie.tmdb_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(collection_id)
    }

    /// Record a collection member the library lacks. Returns false when the
    /// row already existed.
    pub async fn insert_missing(
        &self,
        collection_id: i64,
        missing: &UpsertMissingMovie,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO missing_movies (collection_id, title, tmdb_id, poster_url, release_date)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(collection_id, tmdb_id) DO NOTHING
            "#,
        )
        .bind(collection_id)
        .bind(&missing.title)
        .bind(missing.tmdb_id)
        .bind(&missing.poster_url)
        .bind(&missing.release_date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Drop missing rows for movies that are now in the catalog
    pub async fn prune_owned_missing(&self) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM missing_movies WHERE tmdb_id IN (SELECT tmdb_id FROM movies)",
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Drop collections no catalog movie belongs to any more
    pub async fn prune_orphan_collections(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM collections
            WHERE tmdb_id NOT IN (
                SELECT collection_tmdb_id FROM movies WHERE collection_tmdb_id IS NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete every movie with this title, together with the singleton
    /// collections they owned. Returns the number of movies removed.
    pub async fn purge_title(&self, title: &str) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        let ids = sqlx::query_scalar::<_, i64>("SELECT tmdb_id FROM movies WHERE title = ?")
            .bind(title)
            .fetch_all(&mut *tx)
            .await?;

        for id in &ids {
            sqlx::query("DELETE FROM movies WHERE tmdb_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            sqlx::query("DELETE FROM collections WHERE tmdb_id = ?")
                .bind(format!("standalone-{}", id))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit()
            .await
            .with_context(|| format!("Failed to purge movie '{}'", title))?;

        Ok(ids.len())
    }

    /// All collections with their owned and missing movies
    pub async fn list_collections(&self) -> Result<Vec<CollectionWithMissing>> {
        let collections = sqlx::query_as::<_, CollectionRecord>(
            "SELECT id, tmdb_id, name, poster_url FROM collections ORDER BY name COLLATE NOCASE",
        )
        .fetch_all(&self.pool)
        .await?;

        let movies = sqlx::query_as::<_, MovieRecord>(
            "SELECT * FROM movies WHERE collection_tmdb_id IS NOT NULL ORDER BY release_date, title",
        )
        .fetch_all(&self.pool)
        .await?;

        let missing = sqlx::query_as::<_, MissingMovieRecord>(
            "SELECT * FROM missing_movies ORDER BY release_date, title",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut owned_by_collection: HashMap<String, Vec<MovieRecord>> = HashMap::new();
        for movie in movies {
            if let Some(key) = movie.collection_tmdb_id.clone() {
                owned_by_collection.entry(key).or_default().push(movie);
            }
        }

        let mut missing_by_collection: HashMap<i64, Vec<MissingMovieRecord>> = HashMap::new();
        for row in missing {
            missing_by_collection.entry(row.collection_id).or_default().push(row);
        }

        Ok(collections
            .into_iter()
            .map(|collection| CollectionWithMissing {
                owned: owned_by_collection.remove(&collection.tmdb_id).unwrap_or_default(),
                missing: missing_by_collection.remove(&collection.id).unwrap_or_default(),
                collection,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn db() -> Database {
        let db = Database::connect_in_memory().await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn movie(title: &str, id: i64) -> UpsertMovie {
        UpsertMovie {
            title: title.to_string(),
            tmdb_id: id,
            ..Default::default()
        }
    }

    fn collection(key: &str, name: &str) -> UpsertCollection {
        UpsertCollection {
            tmdb_id: key.to_string(),
            name: name.to_string(),
            poster_url: None,
        }
    }

    fn missing(title: &str, id: i64) -> UpsertMissingMovie {
        UpsertMissingMovie {
            title: title.to_string(),
            tmdb_id: id,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_missing_insert_is_idempotent() {
        let db = db().await;
        let repo = db.movies();
        let cid = repo
            .save(&movie("Alien", 348), &collection("8091", "Alien Collection"))
            .await
            .unwrap();

        assert!(repo.insert_missing(cid, &missing("Aliens", 679)).await.unwrap());
        assert!(!repo.insert_missing(cid, &missing("Aliens", 679)).await.unwrap());

        let collections = repo.list_collections().await.unwrap();
        assert_eq!(collections.len(), 1);
        assert_eq!(collections[0].owned.len(), 1);
        assert_eq!(collections[0].missing.len(), 1);
    }

    #[tokio::test]
    async fn test_saving_owned_movie_drops_its_missing_row() {
        let db = db().await;
        let repo = db.movies();
        let cid = repo
            .save(&movie("Alien", 348), &collection("8091", "Alien Collection"))
            .await
            .unwrap();
        repo.insert_missing(cid, &missing("Aliens", 679)).await.unwrap();

        repo.save(&movie("Aliens", 679), &collection("8091", "Alien Collection"))
            .await
            .unwrap();

        let collections = repo.list_collections().await.unwrap();
        assert!(collections[0].missing.is_empty());
        assert_eq!(collections[0].owned.len(), 2);
    }

    #[tokio::test]
    async fn test_purge_title_drops_singleton_collection() {
        let db = db().await;
        let repo = db.movies();
        repo.save(&movie("Heat", 949), &collection("standalone-949", "Heat"))
            .await
            .unwrap();

        assert_eq!(repo.purge_title("Heat").await.unwrap(), 1);
        assert!(repo.list_collections().await.unwrap().is_empty());
        assert!(repo.list_titles().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prune_orphan_collections() {
        let db = db().await;
        let repo = db.movies();
        let cid = repo
            .save(&movie("Alien", 348), &collection("8091", "Alien Collection"))
            .await
            .unwrap();
        repo.insert_missing(cid, &missing("Aliens", 679)).await.unwrap();
        repo.purge_title("Alien").await.unwrap();

        assert_eq!(repo.prune_orphan_collections().await.unwrap(), 1);

        let leftover: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM missing_movies")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(leftover, 0);
    }
}
