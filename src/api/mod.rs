//! REST API route definitions
//!
//! Everything is JSON. Errors come back as `{"error": "..."}` with a status
//! code matching the failure (409 for scan state conflicts, 404 for unknown
//! shows).

pub mod catalog;
pub mod error;
pub mod health;
pub mod scans;
pub mod search;

use axum::Router;

pub use error::{ApiError, ApiResult};

use crate::AppState;

/// Routes mounted under `/api`
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(scans::router())
        .merge(catalog::router())
        .merge(search::router())
}
