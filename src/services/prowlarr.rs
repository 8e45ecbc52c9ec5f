//! Prowlarr search client
//!
//! Uses Prowlarr's JSON search endpoint across all configured indexers.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::indexer::{Indexer, Release};
use super::rate_limiter::{RateLimitedClient, ensure_success};

/// Prowlarr API client
pub struct ProwlarrClient {
    base_url: String,
    api_key: String,
    client: RateLimitedClient,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProwlarrRelease {
    title: String,
    #[serde(default)]
    size: u64,
    seeders: Option<i32>,
    #[serde(default)]
    categories: Vec<ProwlarrCategory>,
    magnet_url: Option<String>,
    download_url: Option<String>,
    indexer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProwlarrCategory {
    id: u32,
}

impl ProwlarrRelease {
    /// Magnet links are preferred over download URLs
    fn into_release(self) -> Option<Release> {
        let link = self
            .magnet_url
            .filter(|m| !m.is_empty())
            .or(self.download_url.filter(|d| !d.is_empty()))?;

        Some(Release {
            title: self.title,
            seeders: self.seeders.unwrap_or(0),
            size_bytes: self.size,
            category_id: self.categories.first().map(|c| c.id),
            link,
        })
    }
}

impl ProwlarrClient {
    pub fn new(base_url: String, api_key: String) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: RateLimitedClient::for_indexer()?,
        })
    }

    /// Free-text search across every indexer
    pub async fn search_releases(&self, query: &str) -> Result<Vec<Release>> {
        info!("Searching Prowlarr for '{}'", query);

        let url = format!("{}/api/v1/search", self.base_url);
        let response = self
            .client
            .get_with_headers_and_query(
                &url,
                &[("X-Api-Key", self.api_key.as_str())],
                &[("query", query), ("type", "search")],
            )
            .await?;
        let response = ensure_success(response, "Prowlarr search")?;

        let raw: Vec<ProwlarrRelease> = response
            .json()
            .await
            .context("Failed to parse Prowlarr search response")?;

        let mut releases: Vec<Release> = raw
            .into_iter()
            .inspect(|r| debug!(title = %r.title, indexer = ?r.indexer, "Prowlarr result"))
            .filter_map(ProwlarrRelease::into_release)
            .collect();
        releases.sort_by(|a, b| b.seeders.cmp(&a.seeders));

        Ok(releases)
    }
}

#[async_trait]
impl Indexer for ProwlarrClient {
    async fn search(&self, query: &str) -> Result<Vec<Release>> {
        self.search_releases(query).await
    }
}
