use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    feed: &'static str,
    symbols: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        feed: state.feed.state().await.name(),
        symbols: state.history.symbols().len(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/health", get(health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "ok",
            version: "1.0.0",
            feed: "disconnected",
            symbols: 0,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"version\":\"1.0.0\""));
        assert!(json.contains("\"feed\":\"disconnected\""));
    }

    #[tokio::test]
    async fn test_health_handler() {
        let state = AppState::new(Config::default());
        state.history.push("R_100", 1.0).unwrap();
        let Json(response) = health(State(state)).await;
        assert_eq!(response.status, "ok");
        assert_eq!(response.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(response.feed, "disconnected");
        assert_eq!(response.symbols, 1);
    }
}
