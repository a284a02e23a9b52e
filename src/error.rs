use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::engine::candles::CandleError;
use crate::store::LogError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<LogError> for AppError {
    fn from(err: LogError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<CandleError> for AppError {
    fn from(err: CandleError) -> Self {
        match err {
            CandleError::TimescaleTooShort
            | CandleError::NegativeBound
            | CandleError::RangeTooWide(_) => AppError::BadRequest(err.to_string()),
            CandleError::Log(err) => AppError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
