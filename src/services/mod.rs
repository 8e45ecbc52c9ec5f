//! External service integrations

pub mod download;
pub mod indexer;
pub mod library;
pub mod metadata;
pub mod plex;
pub mod prowlarr;
pub mod qbittorrent;
pub mod rate_limiter;
pub mod tmdb;

pub use download::{DownloadClient, DownloadPayload, PayloadResolver};
pub use indexer::{Indexer, Release};
pub use library::{LibraryEpisode, LibraryItem, LibrarySource};
pub use metadata::MetadataSource;
pub use plex::PlexClient;
pub use prowlarr::ProwlarrClient;
pub use qbittorrent::QbittorrentClient;
pub use tmdb::TmdbClient;
