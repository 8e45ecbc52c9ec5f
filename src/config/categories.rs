//! Category mapping between indexer results and the download client
//!
//! Loaded from an optional YAML file:
//!
//! ```yaml
//! movies: movies
//! tv: tv
//! indexer_categories:
//!   2000: movie
//!   5000: tv
//! ```
//!
//! Only these three keys are accepted. Indexer category ids are Newznab ids;
//! a sub-category (e.g. 5040) falls back to its parent block (5000) when it
//! has no entry of its own.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::catalog::MediaKind;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryConfig {
    /// Download client category for movies
    pub movies: String,
    /// Download client category for TV
    pub tv: String,
    /// Indexer category id to media kind
    #[serde(default)]
    pub indexer_categories: BTreeMap<u32, MediaKind>,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            movies: "movies".to_string(),
            tv: "tv".to_string(),
            indexer_categories: BTreeMap::from([(2000, MediaKind::Movie), (5000, MediaKind::Tv)]),
        }
    }
}

impl CategoryConfig {
    /// Read and validate a category file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read category config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Invalid category config {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: CategoryConfig = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.movies.trim().is_empty() {
            anyhow::bail!("'movies' category label is empty");
        }
        if self.tv.trim().is_empty() {
            anyhow::bail!("'tv' category label is empty");
        }
        if self.indexer_categories.contains_key(&0) {
            anyhow::bail!("indexer category id 0 is not valid");
        }
        Ok(())
    }

    /// Download client label for a media kind
    pub fn label_for(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::Movie => &self.movies,
            MediaKind::Tv => &self.tv,
        }
    }

    /// Media kind of an indexer category id, if mapped
    pub fn kind_for_category(&self, category_id: u32) -> Option<MediaKind> {
        self.indexer_categories
            .get(&category_id)
            .or_else(|| self.indexer_categories.get(&(category_id / 1000 * 1000)))
            .copied()
    }
}
