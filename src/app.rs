//! Application state and HTTP router construction.
//!
//! Used by [main] and by the integration tests to build the Axum app.

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::CategoryConfig;
use crate::db::Database;
use crate::jobs::ScanController;
use crate::services::{DownloadClient, Indexer, PayloadResolver};

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub controller: Arc<ScanController>,
    /// Release search; `None` when no indexer is configured
    pub indexer: Option<Arc<dyn Indexer>>,
    /// Download client; `None` when none is configured
    pub downloads: Option<Arc<dyn DownloadClient>>,
    pub resolver: Arc<PayloadResolver>,
    pub categories: Arc<CategoryConfig>,
}

/// Build the full Axum router: health probes, /api, layers.
/// Returns Router<()> (state fully applied) for use with axum::serve.
pub fn build_app(state: AppState) -> Router<()> {
    Router::new()
        .merge(crate::api::health::router())
        .nest("/api", crate::api::router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
