use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::feed::{FeedError, IngestError};
use crate::services::history::HistoryError;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::Feed(FeedError::InvalidTransition { .. }) => (StatusCode::CONFLICT, self.to_string()),
            AppError::Feed(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
            AppError::History(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::SerdeJson(e) => (StatusCode::BAD_REQUEST, e.to_string()),
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

impl From<IngestError> for AppError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::Feed(e) => AppError::Feed(e),
            IngestError::History(e) => AppError::History(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConnectionState;

    #[test]
    fn test_status_mapping() {
        let response = AppError::NotFound("R_100".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = AppError::History(HistoryError::InvalidPrice(f64::NAN)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::Feed(FeedError::GaveUp { attempts: 3 }).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = AppError::Feed(FeedError::NotLive {
            state: ConnectionState::Connecting,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = AppError::Feed(FeedError::InvalidTransition {
            state: ConnectionState::Disconnected,
            action: "retry",
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = AppError::Internal("composer task failed".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
