//! Release search types and the indexer trait

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A release returned by the indexer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub title: String,
    pub seeders: i32,
    pub size_bytes: u64,
    /// Newznab category id
    pub category_id: Option<u32>,
    /// Magnet link or .torrent download URL
    pub link: String,
}

impl Release {
    pub fn is_magnet(&self) -> bool {
        self.link.starts_with("magnet:")
    }
}

#[async_trait]
pub trait Indexer: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<Release>>;
}
