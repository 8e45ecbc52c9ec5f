//! Catalog reconciliation engine
//!
//! Pure algorithms shared by the scan jobs and the search API:
//! - [`diff`]: canonical vs. owned episodes, aired/future classification
//! - [`purge`]: removal of catalog rows whose source item disappeared
//! - [`collections`]: movie collection completeness with per-pass memoization
//! - [`matcher`]: release title ownership heuristics

pub mod collections;
pub mod diff;
pub mod matcher;
pub mod purge;

use serde::{Deserialize, Serialize};

pub use collections::{CollectionKey, CollectionTracker};
pub use diff::{Completeness, EpisodeKey, ShowDiff, diff_episodes, start_of_today};
pub use matcher::{OwnedTitles, is_owned};

/// The two kinds of media the catalog tracks. Each kind has its own scan job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Tv,
    Movie,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Tv => write!(f, "tv"),
            MediaKind::Movie => write!(f, "movie"),
        }
    }
}

impl std::str::FromStr for MediaKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tv" | "shows" | "show" => Ok(MediaKind::Tv),
            "movie" | "movies" => Ok(MediaKind::Movie),
            _ => Err(anyhow::anyhow!("Unknown media kind: {}", s)),
        }
    }
}
