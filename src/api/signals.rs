//! Composed trade signal endpoints.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;

use super::ApiResponse;
use crate::error::{AppError, Result};
use crate::types::TradeSignal;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_signals))
        .route("/:symbol", get(get_signal))
}

/// Signals from the latest composer pass.
async fn list_signals(State(state): State<AppState>) -> Json<ApiResponse<Vec<TradeSignal>>> {
    Json(ApiResponse::new(state.signal_store.all()))
}

/// Compose on demand from the stored history.
async fn get_signal(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<TradeSignal>>> {
    let history = state.history.snapshot(&symbol);
    let composer = state.composer.clone();
    let target = symbol.clone();
    let composed = tokio::task::spawn_blocking(move || composer.compose(&target, &history, Utc::now()))
        .await
        .map_err(|e| AppError::Internal(format!("Composer task failed: {}", e)))?;
    let signal = composed.ok_or_else(|| AppError::NotFound(format!("No qualifying signal for {}", symbol)))?;

    state.signal_store.insert(signal.clone());
    Ok(Json(ApiResponse::new(signal)))
}
