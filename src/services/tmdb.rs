//! TMDB (The Movie Database) API client for show and movie metadata
//!
//! TMDB is a popular movie/TV database with a free API.
//! Base URL: https://api.themoviedb.org/3
//!
//! Rate limiting: TMDB allows ~40 requests per 10 seconds.
//! Failed calls are not retried; the scan treats them as absent data.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::metadata::{
    CollectionDetail, CollectionMember, CollectionRef, EpisodeDetail, MetadataSource, MovieDetail,
    SeasonDetail, ShowDetail,
};
use super::rate_limiter::{RateLimitedClient, ensure_success};
use crate::catalog::MediaKind;

/// TMDB API client with rate limiting
pub struct TmdbClient {
    client: Arc<RateLimitedClient>,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TmdbSearchResult<T> {
    pub page: i32,
    pub results: Vec<T>,
    pub total_pages: i32,
    pub total_results: i32,
}

/// TV show search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbTvSearchHit {
    pub id: i64,
    pub name: String,
    pub first_air_date: Option<String>,
}

/// TV show details from TMDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbTvShow {
    pub id: i64,
    pub name: String,
    pub status: Option<String>,
    pub first_air_date: Option<String>,
    pub last_air_date: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub number_of_seasons: Option<i32>,
    pub number_of_episodes: Option<i32>,
    #[serde(default)]
    pub genres: Vec<TmdbNamed>,
    #[serde(default)]
    pub networks: Vec<TmdbNamed>,
    pub vote_average: Option<f64>,
}

/// Season details from TMDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbSeason {
    pub season_number: i32,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub air_date: Option<String>,
    #[serde(default)]
    pub episodes: Vec<TmdbEpisode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbEpisode {
    pub episode_number: i32,
    pub name: Option<String>,
    pub air_date: Option<String>,
    pub overview: Option<String>,
    pub still_path: Option<String>,
}

/// Movie details from TMDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbMovie {
    pub id: i64,
    pub title: String,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub poster_path: Option<String>,
    #[serde(default)]
    pub adult: bool,
    #[serde(default)]
    pub video: bool,
    /// Collection info (only in movie details, not search)
    pub belongs_to_collection: Option<TmdbCollectionInfo>,
    /// Production companies (only in movie details)
    pub production_companies: Option<Vec<TmdbNamed>>,
    /// Status (only in movie details)
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbNamed {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbCollectionInfo {
    pub id: i64,
    pub name: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
}

/// Collection details from TMDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbCollection {
    pub id: i64,
    pub name: String,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub parts: Vec<TmdbMovie>,
}

impl TmdbClient {
    /// Create a new TMDB client with the given API key
    pub fn new(api_key: String) -> Result<Self> {
        Ok(Self {
            client: Arc::new(RateLimitedClient::for_tmdb()?),
            base_url: "https://api.themoviedb.org/3".to_string(),
            api_key,
        })
    }

    /// Point the client at a different API root (test servers, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Check if the client has a valid API key configured
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Get the image base URL for poster/backdrop images
    pub fn image_url(&self, path: &str, size: &str) -> String {
        format!("https://image.tmdb.org/t/p/{}{}", size, path)
    }

    /// Get full poster URL (w500 size - good for display)
    pub fn poster_url(&self, path: Option<&str>) -> Option<String> {
        path.map(|p| self.image_url(p, "w500"))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        extra: &[(&str, String)],
        operation: &str,
    ) -> Result<T> {
        if !self.has_api_key() {
            anyhow::bail!("TMDB API key not configured");
        }

        let url = format!("{}{}", self.base_url, path);
        let mut query: Vec<(&str, String)> = vec![("api_key", self.api_key.clone())];
        query.extend(extra.iter().cloned());

        let response = self.client.get_with_query(&url, &query).await?;
        let response = ensure_success(response, operation)?;

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", operation))
    }

    /// Search for TV shows by name
    pub async fn search_tv(&self, query: &str, year: Option<i32>) -> Result<Vec<TmdbTvSearchHit>> {
        info!("Searching TMDB for show '{}'", query);

        let mut params = vec![("query", query.to_string())];
        if let Some(y) = year {
            params.push(("first_air_date_year", y.to_string()));
        }

        let results: TmdbSearchResult<TmdbTvSearchHit> =
            self.get_json("/search/tv", &params, "TMDB TV search").await?;

        debug!(count = results.results.len(), "TMDB TV search returned results");
        Ok(results.results)
    }

    /// Search for movies by name
    pub async fn search_movies(&self, query: &str, year: Option<i32>) -> Result<Vec<TmdbMovie>> {
        info!(
            "Searching TMDB for movie '{}'{}",
            query,
            year.map(|y| format!(" ({})", y)).unwrap_or_default()
        );

        let mut params = vec![
            ("query", query.to_string()),
            ("include_adult", "false".to_string()),
        ];
        if let Some(y) = year {
            params.push(("year", y.to_string()));
        }

        let results: TmdbSearchResult<TmdbMovie> =
            self.get_json("/search/movie", &params, "TMDB movie search").await?;

        debug!(count = results.results.len(), "TMDB movie search returned results");
        Ok(results.results)
    }

    /// Get TV show details by TMDB ID
    pub async fn get_tv(&self, tmdb_id: i64) -> Result<TmdbTvShow> {
        debug!("Fetching show details from TMDB (ID: {})", tmdb_id);
        self.get_json(&format!("/tv/{}", tmdb_id), &[], "TMDB get show").await
    }

    /// Get one season with its episodes
    pub async fn get_season(&self, tmdb_id: i64, season_number: i32) -> Result<TmdbSeason> {
        debug!("Fetching season {} of show {} from TMDB", season_number, tmdb_id);
        self.get_json(
            &format!("/tv/{}/season/{}", tmdb_id, season_number),
            &[],
            "TMDB get season",
        )
        .await
    }

    /// Get movie details by TMDB ID
    pub async fn get_movie(&self, tmdb_id: i64) -> Result<TmdbMovie> {
        debug!("Fetching movie details from TMDB (ID: {})", tmdb_id);
        self.get_json(&format!("/movie/{}", tmdb_id), &[], "TMDB get movie").await
    }

    /// Get collection details
    pub async fn get_collection(&self, collection_id: i64) -> Result<TmdbCollection> {
        debug!("Fetching collection from TMDB (ID: {})", collection_id);
        self.get_json(
            &format!("/collection/{}", collection_id),
            &[],
            "TMDB get collection",
        )
        .await
    }
}

impl TmdbMovie {
    /// First production company, used as the studio
    pub fn studio(&self) -> Option<String> {
        self.production_companies
            .as_ref()
            .and_then(|companies| companies.first())
            .map(|company| company.name.clone())
    }
}

#[async_trait]
impl MetadataSource for TmdbClient {
    async fn resolve_id(&self, title: &str, year: Option<i32>, kind: MediaKind) -> Result<Option<i64>> {
        let id = match kind {
            MediaKind::Tv => self.search_tv(title, year).await?.first().map(|hit| hit.id),
            MediaKind::Movie => self.search_movies(title, year).await?.first().map(|hit| hit.id),
        };
        Ok(id)
    }

    async fn fetch_show(&self, id: i64) -> Result<ShowDetail> {
        let show = self.get_tv(id).await?;
        Ok(ShowDetail {
            id: show.id,
            poster_url: self.poster_url(show.poster_path.as_deref()),
            name: show.name,
            status: show.status,
            first_air_date: show.first_air_date,
            overview: show.overview,
            season_count: show.number_of_seasons.unwrap_or(0),
            episode_count: show.number_of_episodes.unwrap_or(0),
            genres: show.genres.into_iter().map(|g| g.name).collect(),
            networks: show.networks.into_iter().map(|n| n.name).collect(),
            vote_average: show.vote_average,
        })
    }

    async fn fetch_season(&self, show_id: i64, season_number: i32) -> Result<SeasonDetail> {
        let season = self.get_season(show_id, season_number).await?;
        Ok(SeasonDetail {
            season_number: season.season_number,
            name: season.name,
            overview: season.overview,
            poster_path: season.poster_path,
            air_date: season.air_date,
            episodes: season
                .episodes
                .into_iter()
                .map(|ep| EpisodeDetail {
                    episode_number: ep.episode_number,
                    name: ep.name,
                    air_date: ep.air_date.filter(|d| !d.is_empty()),
                    overview: ep.overview,
                    still_path: ep.still_path,
                })
                .collect(),
        })
    }

    async fn fetch_movie(&self, id: i64) -> Result<MovieDetail> {
        let movie = self.get_movie(id).await?;
        Ok(MovieDetail {
            id: movie.id,
            studio: movie.studio(),
            poster_url: self.poster_url(movie.poster_path.as_deref()),
            collection: movie.belongs_to_collection.map(|c| CollectionRef {
                id: c.id,
                poster_url: self.poster_url(c.poster_path.as_deref()),
                name: c.name,
            }),
            title: movie.title,
            overview: movie.overview,
            release_date: movie.release_date,
        })
    }

    async fn fetch_collection(&self, collection_id: i64) -> Result<CollectionDetail> {
        let collection = self.get_collection(collection_id).await?;
        Ok(CollectionDetail {
            id: collection.id,
            poster_url: self.poster_url(collection.poster_path.as_deref()),
            name: collection.name,
            members: collection
                .parts
                .into_iter()
                .map(|part| CollectionMember {
                    id: part.id,
                    poster_url: self.poster_url(part.poster_path.as_deref()),
                    title: part.title,
                    release_date: part.release_date,
                })
                .collect(),
        })
    }
}
