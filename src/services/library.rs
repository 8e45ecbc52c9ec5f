//! Library snapshot types and the source trait
//!
//! The library source (Plex) reports what is on disk right now. Every scan
//! pass starts from one full snapshot of the relevant section.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::catalog::{EpisodeKey, MediaKind};

/// One top-level library item (a show or a movie)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryItem {
    pub title: String,
    pub year: Option<i32>,
    /// TMDB id the library already tagged the item with, if any
    pub tagged_id: Option<i64>,
    /// Episodes on disk (empty for movies)
    pub children: Vec<LibraryEpisode>,
}

/// An episode file present in the library
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryEpisode {
    pub season_number: i32,
    pub episode_number: i32,
    pub resolution: Option<String>,
    pub file_path: Option<String>,
    pub original_air_date: Option<String>,
}

impl LibraryEpisode {
    pub fn key(&self) -> EpisodeKey {
        EpisodeKey::new(self.season_number, self.episode_number)
    }
}

/// Source of the on-disk inventory
#[async_trait]
pub trait LibrarySource: Send + Sync {
    /// Full listing of one library section
    async fn list_items(&self, kind: MediaKind) -> Result<Vec<LibraryItem>>;

    /// A single item by exact title. The default scans the full listing.
    async fn find_item(&self, kind: MediaKind, title: &str) -> Result<Option<LibraryItem>> {
        Ok(self
            .list_items(kind)
            .await?
            .into_iter()
            .find(|item| item.title == title))
    }
}
