//! Errors surfaced by the scan controller and the catalog engine

use thiserror::Error;

use crate::catalog::MediaKind;

#[derive(Error, Debug)]
pub enum ScanError {
    /// A scan of either kind is already in progress
    #[error("a {0} scan is already running")]
    AlreadyRunning(MediaKind),

    /// Stop was requested for a job that is idle
    #[error("no {0} scan is running")]
    NotRunning(MediaKind),

    /// The metadata source has no canonical id for the item
    #[error("no TMDB match for '{0}'")]
    ResolutionMiss(String),

    /// A network call to an external collaborator failed
    #[error("{service} unavailable: {source:#}")]
    CollaboratorUnavailable {
        service: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// Writing to the catalog failed; fatal to the current pass
    #[error("catalog write failed: {0:#}")]
    Persistence(anyhow::Error),

    /// The library source has no item with this title
    #[error("'{0}' is not in the library")]
    ShowNotFound(String),
}

impl ScanError {
    pub fn unavailable(service: &'static str, source: anyhow::Error) -> Self {
        Self::CollaboratorUnavailable { service, source }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
