use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::models::{ProductCategory, UnknownCategory};

pub type AppResult<T> = Result<T, AppError>;

/// Errors surfaced by the REST gateway. Upstream and internal failures are
/// logged in full but answered with a short generic message.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    InvalidCategory(#[from] UnknownCategory),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Upstream(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::InvalidCategory(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::InvalidCategory(e) => json!({
                "error": e.to_string(),
                "valid_categories": ProductCategory::names(),
            }),
            AppError::Upstream(message) => {
                error!(%message, "Upstream operation failed");
                json!({ "error": message })
            }
            AppError::Internal(e) => {
                error!(error = ?e, "Internal error");
                json!({ "error": "Internal server error" })
            }
            AppError::BadRequest(message) | AppError::NotFound(message) => {
                json!({ "error": message })
            }
        };
        (status, Json(body)).into_response()
    }
}
