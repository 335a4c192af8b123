//! Tick ingestion, stored histories and feed status.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::ApiResponse;
use crate::error::{AppError, Result};
use crate::services::FeedAction;
use crate::types::ConnectionState;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TickRequest {
    pub symbol: String,
    pub price: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickResponse {
    pub symbol: String,
    pub length: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub symbol: String,
    pub capacity: usize,
    pub history: Vec<f64>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/ticks", post(push_tick))
        .route("/api/history/:symbol", get(get_history))
        .route("/api/feed", get(feed_state))
        .route("/api/feed/ticks", post(feed_tick))
        .route("/api/feed/:action", post(feed_action))
}

/// Append a price directly to the symbol's history.
async fn push_tick(
    State(state): State<AppState>,
    Json(tick): Json<TickRequest>,
) -> Result<Json<ApiResponse<TickResponse>>> {
    let length = state.history.push(&tick.symbol, tick.price)?;
    Ok(Json(ApiResponse::new(TickResponse {
        symbol: tick.symbol.to_uppercase(),
        length,
    })))
}

/// Append a price through the feed, which only accepts ticks while live.
async fn feed_tick(
    State(state): State<AppState>,
    Json(tick): Json<TickRequest>,
) -> Result<Json<ApiResponse<TickResponse>>> {
    let length = state.feed.ingest(&tick.symbol, tick.price).await?;
    Ok(Json(ApiResponse::new(TickResponse {
        symbol: tick.symbol.to_uppercase(),
        length,
    })))
}

async fn get_history(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<HistoryResponse>>> {
    let history = state.history.snapshot(&symbol);
    if history.is_empty() {
        return Err(AppError::NotFound(format!("No history for {}", symbol)));
    }
    Ok(Json(ApiResponse::new(HistoryResponse {
        symbol: symbol.to_uppercase(),
        capacity: state.history.capacity(),
        history,
    })))
}

async fn feed_state(State(state): State<AppState>) -> Json<ApiResponse<ConnectionState>> {
    Json(ApiResponse::new(state.feed.state().await))
}

/// Report a lifecycle event (`connect`, `open`, `authorize`, `drop`,
/// `retry`, `disconnect`) to the feed and return the resulting state.
async fn feed_action(
    State(state): State<AppState>,
    Path(action): Path<String>,
) -> Result<Json<ApiResponse<ConnectionState>>> {
    let action = FeedAction::from_name(&action).ok_or_else(|| {
        let known: Vec<&str> = FeedAction::ALL.iter().map(FeedAction::name).collect();
        AppError::NotFound(format!("Unknown feed action '{}', expected one of: {}", action, known.join(", ")))
    })?;
    let next = state.feed.apply(action).await?;
    Ok(Json(ApiResponse::new(next)))
}
