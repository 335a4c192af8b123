//! Engine analysis endpoints.
//!
//! Callers post a price history (oldest first) and get back either the full
//! report or one component's record.

use axum::{
    extract::Path,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use super::ApiResponse;
use crate::error::{AppError, Result};
use crate::services::engine::{elliott, ict, manipulation, patterns, smc, spike, strength, technical, volatility};
use crate::services::Engine;
use crate::types::MarketReport;
use crate::AppState;

/// Request body for analysis endpoints.
#[derive(Debug, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub symbol: String,
    pub history: Vec<f64>,
}

impl AnalysisRequest {
    fn validate(&self) -> Result<()> {
        match self.history.iter().position(|p| !p.is_finite()) {
            Some(index) => Err(AppError::BadRequest(format!("Non-finite price at index {}", index))),
            None => Ok(()),
        }
    }
}

/// Components reachable through `/api/analysis/:component`.
pub const COMPONENTS: [&str; 9] = [
    "volatility",
    "strength",
    "pattern",
    "elliott",
    "manipulation",
    "smc",
    "ict",
    "spike",
    "technical",
];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(analyze))
        .route("/:component", post(analyze_component))
}

/// Every component against the posted history.
async fn analyze(Json(request): Json<AnalysisRequest>) -> Result<Json<ApiResponse<MarketReport>>> {
    request.validate()?;
    let report = Engine::analyze(&request.history, &request.symbol, Utc::now());
    Ok(Json(ApiResponse::new(report)))
}

/// One component's record.
async fn analyze_component(
    Path(component): Path<String>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<ApiResponse<Value>>> {
    request.validate()?;
    let history = &request.history;
    let symbol = request.symbol.as_str();
    let now = Utc::now();

    let value = match component.to_lowercase().as_str() {
        "volatility" => serde_json::to_value(volatility::calculate(history))?,
        "strength" => serde_json::to_value(strength::calculate(history))?,
        "pattern" => serde_json::to_value(patterns::analyze(history, symbol, now))?,
        "elliott" => serde_json::to_value(elliott::analyze(history))?,
        "manipulation" => serde_json::to_value(manipulation::detect(history))?,
        "smc" => serde_json::to_value(smc::analyze(history, symbol, now))?,
        "ict" => serde_json::to_value(ict::analyze(history, symbol, now))?,
        "spike" => serde_json::to_value(spike::detect(history, symbol))?,
        "technical" => serde_json::to_value(technical::analyze(history))?,
        _ => {
            return Err(AppError::NotFound(format!(
                "Unknown component '{}', expected one of: {}",
                component,
                COMPONENTS.join(", ")
            )))
        }
    };

    Ok(Json(ApiResponse::new(value)))
}
