//! Fake collaborators and helpers shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use gapscan::catalog::MediaKind;
use gapscan::db::Database;
use gapscan::jobs::{ScanController, ScanDeps, ScanStatus};
use gapscan::services::library::{LibraryEpisode, LibraryItem, LibrarySource};
use gapscan::services::metadata::{
    CollectionDetail, CollectionMember, CollectionRef, EpisodeDetail, MetadataSource, MovieDetail,
    SeasonDetail, ShowDetail,
};

// ============================================================================
// Library
// ============================================================================

#[derive(Default)]
pub struct FakeLibrary {
    items: Mutex<HashMap<MediaKind, Vec<LibraryItem>>>,
    pub fail: AtomicBool,
}

impl FakeLibrary {
    pub fn set(&self, kind: MediaKind, items: Vec<LibraryItem>) {
        self.items.lock().insert(kind, items);
    }
}

#[async_trait]
impl LibrarySource for FakeLibrary {
    async fn list_items(&self, kind: MediaKind) -> Result<Vec<LibraryItem>> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("connection refused");
        }
        Ok(self.items.lock().get(&kind).cloned().unwrap_or_default())
    }
}

pub fn show_item(title: &str, tmdb_id: Option<i64>, owned: &[(i32, i32)]) -> LibraryItem {
    LibraryItem {
        title: title.to_string(),
        year: None,
        tagged_id: tmdb_id,
        children: owned
            .iter()
            .map(|(s, e)| LibraryEpisode {
                season_number: *s,
                episode_number: *e,
                resolution: Some("1080".to_string()),
                file_path: Some(format!("/tv/{}/S{:02}E{:02}.mkv", title, s, e)),
                original_air_date: None,
            })
            .collect(),
    }
}

pub fn movie_item(title: &str, tmdb_id: Option<i64>) -> LibraryItem {
    LibraryItem {
        title: title.to_string(),
        year: None,
        tagged_id: tmdb_id,
        children: Vec::new(),
    }
}

// ============================================================================
// Metadata
// ============================================================================

pub struct FakeMetadata {
    shows: Mutex<HashMap<i64, (ShowDetail, Vec<SeasonDetail>)>>,
    movies: Mutex<HashMap<i64, MovieDetail>>,
    collections: Mutex<HashMap<i64, CollectionDetail>>,
    search: Mutex<HashMap<String, i64>>,
    pub collection_calls: AtomicUsize,
    /// Detail fetches currently blocked on `gate`
    pub waiting: AtomicUsize,
    /// Every show/movie detail fetch takes a permit; tests close it to hold
    /// a pass on its first item.
    pub gate: Semaphore,
}

impl Default for FakeMetadata {
    fn default() -> Self {
        Self {
            shows: Mutex::default(),
            movies: Mutex::default(),
            collections: Mutex::default(),
            search: Mutex::default(),
            collection_calls: AtomicUsize::new(0),
            waiting: AtomicUsize::new(0),
            gate: Semaphore::new(Semaphore::MAX_PERMITS),
        }
    }
}

impl FakeMetadata {
    /// A metadata source whose detail fetches block until `open_gate`
    pub fn gated() -> Self {
        Self {
            gate: Semaphore::new(0),
            ..Self::default()
        }
    }

    pub fn open_gate(&self) {
        self.gate.add_permits(1_000);
    }

    /// Register a show; each season is a list of (episode number, air date)
    pub fn add_show(&self, id: i64, name: &str, status: &str, seasons: &[&[(i32, &str)]]) {
        let seasons: Vec<SeasonDetail> = seasons
            .iter()
            .enumerate()
            .map(|(index, episodes)| SeasonDetail {
                season_number: index as i32 + 1,
                episodes: episodes
                    .iter()
                    .map(|(n, date)| EpisodeDetail {
                        episode_number: *n,
                        air_date: Some(date.to_string()),
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            })
            .collect();

        let detail = ShowDetail {
            id,
            name: name.to_string(),
            status: Some(status.to_string()),
            season_count: seasons.len() as i32,
            episode_count: seasons.iter().map(|s| s.episodes.len() as i32).sum(),
            genres: vec!["Drama".to_string()],
            ..Default::default()
        };
        self.shows.lock().insert(id, (detail, seasons));
    }

    pub fn add_movie(&self, id: i64, title: &str, collection: Option<(i64, &str)>) {
        self.movies.lock().insert(
            id,
            MovieDetail {
                id,
                title: title.to_string(),
                collection: collection.map(|(cid, name)| CollectionRef {
                    id: cid,
                    name: name.to_string(),
                    poster_url: None,
                }),
                ..Default::default()
            },
        );
    }

    pub fn add_collection(&self, id: i64, name: &str, members: &[(i64, &str)]) {
        self.collections.lock().insert(
            id,
            CollectionDetail {
                id,
                name: name.to_string(),
                poster_url: None,
                members: members
                    .iter()
                    .map(|(mid, title)| CollectionMember {
                        id: *mid,
                        title: title.to_string(),
                        ..Default::default()
                    })
                    .collect(),
            },
        );
    }

    pub fn add_search(&self, title: &str, id: i64) {
        self.search.lock().insert(title.to_string(), id);
    }

    async fn pass_gate(&self) {
        self.waiting.fetch_add(1, Ordering::SeqCst);
        let _permit = self.gate.acquire().await;
        self.waiting.fetch_sub(1, Ordering::SeqCst);
    }

    /// Wait until some detail fetch is blocked on the gate
    pub async fn wait_for_blocked_fetch(&self) {
        for _ in 0..500 {
            if self.waiting.load(Ordering::SeqCst) > 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no metadata fetch reached the gate");
    }
}

#[async_trait]
impl MetadataSource for FakeMetadata {
    async fn resolve_id(&self, title: &str, _year: Option<i32>, _kind: MediaKind) -> Result<Option<i64>> {
        Ok(self.search.lock().get(title).copied())
    }

    async fn fetch_show(&self, id: i64) -> Result<ShowDetail> {
        self.pass_gate().await;
        self.shows
            .lock()
            .get(&id)
            .map(|(detail, _)| detail.clone())
            .ok_or_else(|| anyhow::anyhow!("show {} not found (404)", id))
    }

    async fn fetch_season(&self, show_id: i64, season_number: i32) -> Result<SeasonDetail> {
        self.shows
            .lock()
            .get(&show_id)
            .and_then(|(_, seasons)| {
                seasons
                    .iter()
                    .find(|s| s.season_number == season_number)
                    .cloned()
            })
            .ok_or_else(|| anyhow::anyhow!("season {} not found (404)", season_number))
    }

    async fn fetch_movie(&self, id: i64) -> Result<MovieDetail> {
        self.pass_gate().await;
        self.movies
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("movie {} not found (404)", id))
    }

    async fn fetch_collection(&self, collection_id: i64) -> Result<CollectionDetail> {
        self.collection_calls.fetch_add(1, Ordering::SeqCst);
        self.collections
            .lock()
            .get(&collection_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("collection {} not found (404)", collection_id))
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub db: Database,
    pub library: Arc<FakeLibrary>,
    pub metadata: Arc<FakeMetadata>,
    pub controller: Arc<ScanController>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_metadata(FakeMetadata::default()).await
    }

    pub async fn with_metadata(metadata: FakeMetadata) -> Self {
        let db = Database::connect_in_memory().await.unwrap();
        db.migrate().await.unwrap();

        let library = Arc::new(FakeLibrary::default());
        let metadata = Arc::new(metadata);
        let controller = Arc::new(ScanController::new(ScanDeps {
            db: db.clone(),
            library: library.clone(),
            metadata: metadata.clone(),
            item_delay_ms: 0..=0,
        }));

        Self {
            db,
            library,
            metadata,
            controller,
        }
    }

    /// Start a pass and wait for it to finish
    pub async fn run(&self, kind: MediaKind) -> ScanStatus {
        self.controller.start(kind).unwrap();
        self.wait_idle(kind).await
    }

    pub async fn wait_idle(&self, kind: MediaKind) -> ScanStatus {
        for _ in 0..500 {
            let status = self.controller.status(kind);
            if !status.in_progress {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{} scan did not finish in time", kind);
    }

    /// Wait until the pass is working on `label`
    pub async fn wait_for_item(&self, kind: MediaKind, label: &str) {
        for _ in 0..500 {
            if self.controller.status(kind).current_item.as_deref() == Some(label) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{} scan never reached '{}'", kind, label);
    }

    /// Primary keys of a table in ascending order
    pub async fn ids(&self, table: &str) -> Vec<i64> {
        sqlx::query_scalar(&format!("SELECT id FROM {} ORDER BY id", table))
            .fetch_all(self.db.pool())
            .await
            .unwrap()
    }

    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(self.db.pool())
            .await
            .unwrap()
    }
}
