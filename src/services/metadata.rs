//! Unified metadata types and the resolver trait
//!
//! The resolver maps library items to canonical TMDB ids and fetches the
//! canonical detail the diff and collection engines work from. The TMDB
//! client in [`super::tmdb`] is the production implementation.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::catalog::MediaKind;

/// Canonical show detail
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShowDetail {
    pub id: i64,
    pub name: String,
    /// Series status as reported ("Returning Series", "Ended", ...)
    pub status: Option<String>,
    pub first_air_date: Option<String>,
    pub overview: Option<String>,
    pub poster_url: Option<String>,
    pub season_count: i32,
    pub episode_count: i32,
    pub genres: Vec<String>,
    pub networks: Vec<String>,
    pub vote_average: Option<f64>,
}

/// Canonical season with its episode list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonDetail {
    pub season_number: i32,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub air_date: Option<String>,
    pub episodes: Vec<EpisodeDetail>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeDetail {
    pub episode_number: i32,
    pub name: Option<String>,
    pub air_date: Option<String>,
    pub overview: Option<String>,
    pub still_path: Option<String>,
}

/// Canonical movie detail
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieDetail {
    pub id: i64,
    pub title: String,
    pub overview: Option<String>,
    pub poster_url: Option<String>,
    pub release_date: Option<String>,
    pub studio: Option<String>,
    pub collection: Option<CollectionRef>,
}

/// Collection membership as reported on a movie
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionRef {
    pub id: i64,
    pub name: String,
    pub poster_url: Option<String>,
}

/// Full collection with its members
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionDetail {
    pub id: i64,
    pub name: String,
    pub poster_url: Option<String>,
    pub members: Vec<CollectionMember>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionMember {
    pub id: i64,
    pub title: String,
    pub poster_url: Option<String>,
    pub release_date: Option<String>,
}

/// Canonical metadata source
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Search by title, returning the best match's id
    async fn resolve_id(&self, title: &str, year: Option<i32>, kind: MediaKind) -> Result<Option<i64>>;

    async fn fetch_show(&self, id: i64) -> Result<ShowDetail>;

    async fn fetch_season(&self, show_id: i64, season_number: i32) -> Result<SeasonDetail>;

    async fn fetch_movie(&self, id: i64) -> Result<MovieDetail>;

    async fn fetch_collection(&self, collection_id: i64) -> Result<CollectionDetail>;
}
