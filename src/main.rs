//! gapscan - finds the episodes and collection movies missing from a Plex library
//!
//! Entry point: loads configuration, opens the catalog, wires the Plex, TMDB,
//! Prowlarr and qBittorrent adapters, and serves the JSON API.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gapscan::app::{AppState, build_app};
use gapscan::config::Config;
use gapscan::db::Database;
use gapscan::jobs::{self, ScanController, ScanDeps};
use gapscan::services::{
    DownloadClient, Indexer, PayloadResolver, PlexClient, ProwlarrClient, QbittorrentClient,
    TmdbClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gapscan=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!("Starting gapscan");

    let config = Arc::new(Config::from_env()?);
    tracing::info!("Configuration loaded");

    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;
    tracing::info!("Database connected");

    let library = Arc::new(PlexClient::new(
        config.plex_url.clone(),
        config.plex_token.clone(),
        config.plex_tv_section.clone(),
        config.plex_movie_section.clone(),
    )?);

    let tmdb = TmdbClient::new(config.tmdb_api_key.clone().unwrap_or_default())?;
    if !tmdb.has_api_key() {
        tracing::warn!("TMDB_API_KEY not set - every show will be recorded as Unknown");
    }

    let controller = Arc::new(ScanController::new(ScanDeps {
        db: db.clone(),
        library,
        metadata: Arc::new(tmdb),
        item_delay_ms: config.scan_item_delay_ms.clone(),
    }));

    let indexer: Option<Arc<dyn Indexer>> =
        match (config.prowlarr_url.clone(), config.prowlarr_api_key.clone()) {
            (Some(url), Some(key)) => Some(Arc::new(ProwlarrClient::new(url, key)?)),
            _ => {
                tracing::info!("Prowlarr not configured - release search disabled");
                None
            }
        };

    let downloads: Option<Arc<dyn DownloadClient>> = match config.qbittorrent_url.clone() {
        Some(url) => Some(Arc::new(QbittorrentClient::new(
            url,
            config.qbittorrent_username.clone().unwrap_or_default(),
            config.qbittorrent_password.clone().unwrap_or_default(),
        )?)),
        None => {
            tracing::info!("qBittorrent not configured - downloads disabled");
            None
        }
    };

    let _scheduler = match config.scan_schedule.as_deref() {
        Some(schedule) => Some(jobs::start_scheduler(controller.clone(), schedule).await?),
        None => None,
    };

    let state = AppState {
        db,
        controller,
        indexer,
        downloads,
        resolver: Arc::new(PayloadResolver::new()?),
        categories: Arc::new(config.categories.clone()),
    };

    let app = build_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
