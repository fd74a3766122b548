use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use stock_insight::StockError;
use thiserror::Error;
use tracing::{error, warn};

/// Unified error type for API responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad_request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Stock(#[from] StockError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Stock(error) => stock_error_status(error),
        }
    }
}

/// Status code a [`StockError`] is reported with.
pub fn stock_error_status(error: &StockError) -> StatusCode {
    match error {
        error if error.is_validation() => StatusCode::BAD_REQUEST,
        StockError::UpstreamFetch { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Message a [`StockError`] is reported with. Upstream and configuration details stay
/// in the logs.
pub fn public_message(error: &StockError) -> String {
    match error {
        StockError::UpstreamFetch { ticker, .. } => {
            format!("failed to fetch price history for {ticker}")
        }
        StockError::Config(_) => "internal server error".to_string(),
        error => error.to_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::BadRequest(msg) => msg.clone(),
            Self::Stock(error) => {
                if status == StatusCode::BAD_GATEWAY {
                    warn!(%error, "upstream failure");
                } else if status.is_server_error() {
                    error!(%error, "request failed");
                }
                public_message(error)
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
