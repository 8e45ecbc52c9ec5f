//! Scan jobs and their controller
//!
//! There is one job per media kind. A job is `Idle`, `Running`, or
//! `Stopping` (stop requested, the in-flight item still finishing). At most
//! one job of either kind is in progress at any time.

pub mod movie_scan;
pub mod tv_scan;

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::Rng;
use serde::Serialize;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::catalog::{MediaKind, ShowDiff};
use crate::db::Database;
use crate::error::{Result, ScanError};
use crate::services::library::LibrarySource;
use crate::services::metadata::MetadataSource;

/// Collaborators a scan pass works with
pub struct ScanDeps {
    pub db: Database,
    pub library: Arc<dyn LibrarySource>,
    pub metadata: Arc<dyn MetadataSource>,
    /// Randomized pause between top-level items, in milliseconds
    pub item_delay_ms: RangeInclusive<u64>,
}

impl ScanDeps {
    /// Sleep for a random duration from the configured range
    pub(crate) async fn pause_between_items(&self) {
        let (min, max) = (*self.item_delay_ms.start(), *self.item_delay_ms.end());
        if max == 0 {
            return;
        }
        let millis = if min >= max {
            max
        } else {
            rand::thread_rng().gen_range(min..=max)
        };
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanPhase {
    Idle,
    Running,
    Stopping,
}

/// Point-in-time view of a job, safe to hand to HTTP callers
#[derive(Debug, Clone, Serialize)]
pub struct ScanStatus {
    pub kind: MediaKind,
    pub phase: ScanPhase,
    pub in_progress: bool,
    pub percent: u32,
    pub current_item: Option<String>,
    pub processed: usize,
    pub total: usize,
    pub status_message: String,
    pub elapsed_secs: Option<u64>,
    pub stop_requested: bool,
}

/// How a pass ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassOutcome {
    pub processed: usize,
    pub total: usize,
    pub stopped: bool,
}

#[derive(Debug)]
struct ScanState {
    phase: ScanPhase,
    processed: usize,
    total: usize,
    current_item: Option<String>,
    status_message: String,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
}

impl Default for ScanState {
    fn default() -> Self {
        Self {
            phase: ScanPhase::Idle,
            processed: 0,
            total: 0,
            current_item: None,
            status_message: "Idle".to_string(),
            started_at: None,
            finished_at: None,
        }
    }
}

/// Lifecycle and progress of one scan kind
#[derive(Debug)]
pub struct ScanJob {
    kind: MediaKind,
    state: Mutex<ScanState>,
}

impl ScanJob {
    pub fn new(kind: MediaKind) -> Self {
        Self {
            kind,
            state: Mutex::new(ScanState::default()),
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn is_in_progress(&self) -> bool {
        self.state.lock().phase != ScanPhase::Idle
    }

    pub fn snapshot(&self) -> ScanStatus {
        let state = self.state.lock();
        let percent = if state.total == 0 {
            0
        } else {
            (state.processed * 100 / state.total) as u32
        };
        let elapsed_secs = state.started_at.map(|started| {
            state
                .finished_at
                .unwrap_or_else(Instant::now)
                .duration_since(started)
                .as_secs()
        });

        ScanStatus {
            kind: self.kind,
            phase: state.phase,
            in_progress: state.phase != ScanPhase::Idle,
            percent,
            current_item: state.current_item.clone(),
            processed: state.processed,
            total: state.total,
            status_message: state.status_message.clone(),
            elapsed_secs,
            stop_requested: state.phase == ScanPhase::Stopping,
        }
    }

    /// Idle -> Running. Callers hold the controller's start lock.
    fn begin(&self) {
        let mut state = self.state.lock();
        *state = ScanState {
            phase: ScanPhase::Running,
            status_message: format!("Starting {} scan", self.kind),
            started_at: Some(Instant::now()),
            ..ScanState::default()
        };
    }

    /// Running -> Stopping; a repeated request is a no-op
    fn request_stop(&self) -> Result<()> {
        let mut state = self.state.lock();
        match state.phase {
            ScanPhase::Idle => Err(ScanError::NotRunning(self.kind)),
            ScanPhase::Running => {
                state.phase = ScanPhase::Stopping;
                state.status_message = "Stopping after the current item".to_string();
                Ok(())
            }
            ScanPhase::Stopping => Ok(()),
        }
    }

    /// Checked once per top-level item
    pub fn should_stop(&self) -> bool {
        self.state.lock().phase == ScanPhase::Stopping
    }

    pub fn set_total(&self, total: usize) {
        let mut state = self.state.lock();
        state.total = total;
        if state.phase == ScanPhase::Running {
            state.status_message = format!("Scanning {} items", total);
        }
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.state.lock().status_message = message.into();
    }

    pub fn begin_item(&self, label: &str) {
        self.state.lock().current_item = Some(label.to_string());
    }

    pub fn item_done(&self) {
        self.state.lock().processed += 1;
    }

    /// Back to Idle, whatever happened to the worker
    fn finish(&self, message: String) {
        let mut state = self.state.lock();
        state.phase = ScanPhase::Idle;
        state.current_item = None;
        state.finished_at = Some(Instant::now());
        state.status_message = message;
    }
}

/// Owns both jobs and enforces single-flight across kinds
pub struct ScanController {
    deps: Arc<ScanDeps>,
    tv: Arc<ScanJob>,
    movies: Arc<ScanJob>,
    start_lock: Mutex<()>,
    /// Held for the whole of a manual re-match; a TV start fails while it is
    rematch: tokio::sync::Mutex<()>,
}

impl ScanController {
    pub fn new(deps: ScanDeps) -> Self {
        Self {
            deps: Arc::new(deps),
            tv: Arc::new(ScanJob::new(MediaKind::Tv)),
            movies: Arc::new(ScanJob::new(MediaKind::Movie)),
            start_lock: Mutex::new(()),
            rematch: tokio::sync::Mutex::new(()),
        }
    }

    fn job(&self, kind: MediaKind) -> &Arc<ScanJob> {
        match kind {
            MediaKind::Tv => &self.tv,
            MediaKind::Movie => &self.movies,
        }
    }

    /// Start a pass in the background. Fails if a pass of either kind is
    /// still running or stopping.
    pub fn start(&self, kind: MediaKind) -> Result<()> {
        {
            let _guard = self.start_lock.lock();
            for job in [&self.tv, &self.movies] {
                if job.is_in_progress() {
                    return Err(ScanError::AlreadyRunning(job.kind()));
                }
            }
            if kind == MediaKind::Tv && self.rematch.try_lock().is_err() {
                return Err(ScanError::AlreadyRunning(MediaKind::Tv));
            }
            self.job(kind).begin();
        }

        info!(kind = %kind, "Scan started");
        self.spawn_worker(kind);
        Ok(())
    }

    /// Ask a running pass to stop after its current item
    pub fn request_stop(&self, kind: MediaKind) -> Result<()> {
        self.job(kind).request_stop()?;
        info!(kind = %kind, "Scan stop requested");
        Ok(())
    }

    pub fn status(&self, kind: MediaKind) -> ScanStatus {
        self.job(kind).snapshot()
    }

    /// Re-diff a single show against a user-supplied canonical id.
    ///
    /// Refused while a TV pass runs; a TV pass cannot start until it is done.
    /// Concurrent re-matches are refused the same way.
    pub async fn rematch_show(&self, title: &str, tmdb_id: i64) -> Result<ShowDiff> {
        let _rematch = {
            let _guard = self.start_lock.lock();
            if self.tv.is_in_progress() {
                return Err(ScanError::AlreadyRunning(MediaKind::Tv));
            }
            self.rematch
                .try_lock()
                .map_err(|_| ScanError::AlreadyRunning(MediaKind::Tv))?
        };

        let item = self
            .deps
            .library
            .find_item(MediaKind::Tv, title)
            .await
            .map_err(|e| ScanError::unavailable("plex", e))?
            .ok_or_else(|| ScanError::ShowNotFound(title.to_string()))?;

        info!(title = %title, tmdb_id, "Re-matching show");
        tv_scan::reconcile_show(&self.deps, &item, Some(tmdb_id)).await
    }

    fn spawn_worker(&self, kind: MediaKind) {
        let deps = self.deps.clone();
        let job = self.job(kind).clone();

        tokio::spawn(async move {
            let worker = {
                let job = job.clone();
                tokio::spawn(async move {
                    match kind {
                        MediaKind::Tv => tv_scan::run(&deps, &job).await,
                        MediaKind::Movie => movie_scan::run(&deps, &job).await,
                    }
                })
            };

            let message = match worker.await {
                Ok(Ok(outcome)) if outcome.stopped => {
                    info!(kind = %kind, processed = outcome.processed, total = outcome.total, "Scan stopped by user");
                    format!(
                        "Scan stopped by user after {} of {} items",
                        outcome.processed, outcome.total
                    )
                }
                Ok(Ok(outcome)) => {
                    info!(kind = %kind, processed = outcome.processed, "Scan completed");
                    format!("Scan complete: {} of {} items", outcome.processed, outcome.total)
                }
                Ok(Err(e)) => {
                    error!(kind = %kind, error = %e, "Scan failed");
                    format!("Scan failed: {}", e)
                }
                Err(e) => {
                    error!(kind = %kind, error = %e, "Scan worker panicked");
                    format!("Scan failed: worker crashed ({})", e)
                }
            };

            job.finish(message);
        });
    }
}

/// Start the cron scheduler that kicks off TV scans
pub async fn start_scheduler(
    controller: Arc<ScanController>,
    schedule: &str,
) -> anyhow::Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let scan_job = Job::new_async(schedule, move |_uuid, _l| {
        let controller = controller.clone();
        Box::pin(async move {
            info!("Running scheduled TV scan");
            if let Err(e) = controller.start(MediaKind::Tv) {
                warn!(error = %e, "Scheduled TV scan skipped");
            }
        })
    })?;
    scheduler.add(scan_job).await?;

    scheduler.start().await?;

    info!(schedule = %schedule, "Job scheduler started");
    Ok(scheduler)
}
