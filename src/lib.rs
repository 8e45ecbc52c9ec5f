//! gapscan - media catalog reconciliation
//!
//! Keeps a local catalog of a Plex library in sync with TMDB and reports the
//! episodes and collection movies the user does not own yet.
//!
//! The binary in `main.rs` wires the Plex, TMDB, Prowlarr and qBittorrent
//! adapters into the [`jobs::ScanController`] and serves the JSON API.

pub mod api;
pub mod app;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod services;

pub use app::AppState;
pub use error::ScanError;
