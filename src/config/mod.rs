//! Application configuration management

mod categories;

use std::env;
use std::ops::RangeInclusive;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub use categories::CategoryConfig;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// SQLite database URL (`sqlite://path?mode=rwc`)
    pub database_url: String,

    /// Plex server base URL
    pub plex_url: String,

    /// Plex access token
    pub plex_token: String,

    /// Name of the Plex section holding TV shows
    pub plex_tv_section: String,

    /// Name of the Plex section holding movies
    pub plex_movie_section: String,

    /// TMDB API key
    pub tmdb_api_key: Option<String>,

    /// Prowlarr base URL and API key (search is disabled when unset)
    pub prowlarr_url: Option<String>,
    pub prowlarr_api_key: Option<String>,

    /// qBittorrent Web UI (downloads are disabled when unset)
    pub qbittorrent_url: Option<String>,
    pub qbittorrent_username: Option<String>,
    pub qbittorrent_password: Option<String>,

    /// Randomized pause between top-level items, in milliseconds
    pub scan_item_delay_ms: RangeInclusive<u64>,

    /// Cron expression for the scheduled TV scan
    pub scan_schedule: Option<String>,

    /// Category mapping for indexer results and the download client
    pub categories: CategoryConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/gapscan.db?mode=rwc".to_string());

        let scan_item_delay_ms = match env::var("SCAN_ITEM_DELAY_MS") {
            Ok(raw) => parse_delay_range(&raw).context("Invalid SCAN_ITEM_DELAY_MS")?,
            Err(_) => 250..=750,
        };

        let categories = match env::var("CATEGORIES_PATH") {
            Ok(path) => CategoryConfig::load(&PathBuf::from(path))?,
            Err(_) => CategoryConfig::default(),
        };

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .context("Invalid PORT")?,

            database_url,

            plex_url: parse_base_url("PLEX_URL", &env::var("PLEX_URL").context("PLEX_URL is required")?)?,

            plex_token: env::var("PLEX_TOKEN").context("PLEX_TOKEN is required")?,

            plex_tv_section: env::var("PLEX_TV_SECTION")
                .unwrap_or_else(|_| "TV Shows".to_string()),

            plex_movie_section: env::var("PLEX_MOVIE_SECTION")
                .unwrap_or_else(|_| "Movies".to_string()),

            tmdb_api_key: env::var("TMDB_API_KEY").ok(),

            prowlarr_url: env::var("PROWLARR_URL")
                .ok()
                .map(|raw| parse_base_url("PROWLARR_URL", &raw))
                .transpose()?,
            prowlarr_api_key: env::var("PROWLARR_API_KEY").ok(),

            qbittorrent_url: env::var("QBITTORRENT_URL")
                .ok()
                .map(|raw| parse_base_url("QBITTORRENT_URL", &raw))
                .transpose()?,
            qbittorrent_username: env::var("QBITTORRENT_USERNAME").ok(),
            qbittorrent_password: env::var("QBITTORRENT_PASSWORD").ok(),

            scan_item_delay_ms,

            scan_schedule: env::var("SCAN_SCHEDULE").ok().filter(|s| !s.trim().is_empty()),

            categories,
        })
    }
}

/// Validate an http(s) base URL and strip its trailing slash
pub fn parse_base_url(name: &str, raw: &str) -> Result<String> {
    let parsed = url::Url::parse(raw.trim()).with_context(|| format!("Invalid {}", name))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("{} must be an http(s) URL, got '{}'", name, raw);
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

/// Parse `"250-750"` or a single `"500"` into an inclusive millisecond range
pub fn parse_delay_range(raw: &str) -> Result<RangeInclusive<u64>> {
    let raw = raw.trim();
    let (min, max) = match raw.split_once('-') {
        Some((min, max)) => (min.trim().parse::<u64>()?, max.trim().parse::<u64>()?),
        None => {
            let value = raw.parse::<u64>()?;
            (value, value)
        }
    };

    if min > max {
        anyhow::bail!("delay range {}-{} is reversed", min, max);
    }

    Ok(min..=max)
}
