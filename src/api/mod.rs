pub mod analysis;
pub mod health;
pub mod signals;
pub mod ticks;

use crate::AppState;
use axum::Router;
use serde::Serialize;

/// API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub meta: ApiMeta,
}

#[derive(Debug, Serialize)]
pub struct ApiMeta {
    /// Unix timestamp (milliseconds) the response was built at.
    pub timestamp: i64,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            meta: ApiMeta {
                timestamp: chrono::Utc::now().timestamp_millis(),
            },
        }
    }
}

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(ticks::router())
        .nest("/api/analysis", analysis::router())
        .nest("/api/signals", signals::router())
}
