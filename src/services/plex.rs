//! Plex Media Server client
//!
//! Reads library sections through Plex's JSON API (`Accept:
//! application/json`, token in `X-Plex-Token`). Shows are listed with every
//! episode file below them; movies carry no children.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::library::{LibraryEpisode, LibraryItem, LibrarySource};
use super::rate_limiter::ensure_success;
use crate::catalog::MediaKind;

pub struct PlexClient {
    base_url: String,
    token: String,
    tv_section: String,
    movie_section: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PlexResponse<T> {
    media_container: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SectionContainer {
    #[serde(default)]
    directory: Vec<PlexSection>,
}

#[derive(Debug, Deserialize)]
struct PlexSection {
    key: String,
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MetadataContainer<T> {
    #[serde(default = "Vec::new")]
    metadata: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlexItem {
    rating_key: String,
    title: String,
    year: Option<i32>,
    guid: Option<String>,
    #[serde(rename = "Guid", default)]
    guids: Vec<PlexGuid>,
}

#[derive(Debug, Deserialize)]
struct PlexGuid {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlexEpisode {
    parent_index: Option<i32>,
    index: Option<i32>,
    originally_available_at: Option<String>,
    #[serde(rename = "Media", default)]
    media: Vec<PlexMedia>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlexMedia {
    video_resolution: Option<String>,
    #[serde(rename = "Part", default)]
    parts: Vec<PlexPart>,
}

#[derive(Debug, Deserialize)]
struct PlexPart {
    file: Option<String>,
}

/// Extract a TMDB id from a Plex guid such as `tmdb://1399` or
/// `com.plexapp.agents.themoviedb://603?lang=en`
pub fn parse_tmdb_guid(guid: &str) -> Option<i64> {
    let lower = guid.to_lowercase();
    if !lower.contains("tmdb") && !lower.contains("themoviedb") {
        return None;
    }
    let (_, rest) = guid.split_once("://")?;
    rest.split(['?', '/']).next()?.parse().ok()
}

impl PlexItem {
    fn tmdb_id(&self) -> Option<i64> {
        self.guid
            .as_deref()
            .and_then(parse_tmdb_guid)
            .or_else(|| self.guids.iter().find_map(|g| parse_tmdb_guid(&g.id)))
    }
}

impl PlexEpisode {
    fn into_library_episode(self) -> Option<LibraryEpisode> {
        let season_number = self.parent_index?;
        let episode_number = self.index?;
        let media = self.media.into_iter().next();
        let resolution = media.as_ref().and_then(|m| m.video_resolution.clone());
        let file_path = media.and_then(|m| m.parts.into_iter().find_map(|p| p.file));

        Some(LibraryEpisode {
            season_number,
            episode_number,
            resolution,
            file_path,
            original_air_date: self.originally_available_at,
        })
    }
}

impl PlexClient {
    pub fn new(
        base_url: String,
        token: String,
        tv_section: String,
        movie_section: String,
    ) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            tv_section,
            movie_section,
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .context("Failed to create HTTP client")?,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, operation: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Plex request");

        let response = self
            .client
            .get(&url)
            .header("X-Plex-Token", &self.token)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("{} request failed", operation))?;
        let response = ensure_success(response, operation)?;

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", operation))
    }

    fn section_name(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::Tv => &self.tv_section,
            MediaKind::Movie => &self.movie_section,
        }
    }

    async fn section_key(&self, kind: MediaKind) -> Result<String> {
        let name = self.section_name(kind);
        let sections: PlexResponse<SectionContainer> =
            self.get("/library/sections", "Plex list sections").await?;

        sections
            .media_container
            .directory
            .into_iter()
            .find(|s| s.title == name)
            .map(|s| s.key)
            .with_context(|| format!("Plex library section '{}' not found", name))
    }

    async fn section_items(&self, kind: MediaKind) -> Result<Vec<PlexItem>> {
        let key = self.section_key(kind).await?;
        let items: PlexResponse<MetadataContainer<PlexItem>> = self
            .get(
                &format!("/library/sections/{}/all?includeGuids=1", key),
                "Plex list section",
            )
            .await?;
        Ok(items.media_container.metadata)
    }

    async fn episodes(&self, rating_key: &str) -> Result<Vec<LibraryEpisode>> {
        let leaves: PlexResponse<MetadataContainer<PlexEpisode>> = self
            .get(
                &format!("/library/metadata/{}/allLeaves", rating_key),
                "Plex list episodes",
            )
            .await?;

        Ok(leaves
            .media_container
            .metadata
            .into_iter()
            .filter_map(PlexEpisode::into_library_episode)
            .collect())
    }

    async fn to_library_item(&self, kind: MediaKind, item: PlexItem) -> Result<LibraryItem> {
        let children = match kind {
            MediaKind::Tv => self
                .episodes(&item.rating_key)
                .await
                .with_context(|| format!("Failed to list episodes of '{}'", item.title))?,
            MediaKind::Movie => Vec::new(),
        };

        Ok(LibraryItem {
            tagged_id: item.tmdb_id(),
            title: item.title,
            year: item.year,
            children,
        })
    }
}

#[async_trait]
impl LibrarySource for PlexClient {
    async fn list_items(&self, kind: MediaKind) -> Result<Vec<LibraryItem>> {
        let raw = self.section_items(kind).await?;
        info!(kind = %kind, count = raw.len(), "Listing Plex section");

        let mut items = Vec::with_capacity(raw.len());
        for item in raw {
            items.push(self.to_library_item(kind, item).await?);
        }
        Ok(items)
    }

    async fn find_item(&self, kind: MediaKind, title: &str) -> Result<Option<LibraryItem>> {
        let raw = self.section_items(kind).await?;
        match raw.into_iter().find(|item| item.title == title) {
            Some(item) => Ok(Some(self.to_library_item(kind, item).await?)),
            None => Ok(None),
        }
    }
}
