//! # HTTP Errors
//!
//! Every failure a query endpoint can report before the first row is
//! written. Once streaming starts the status is already 200.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::ast::AstError;
use crate::datasource::DataSourceError;
use crate::plan::PlannerError;

pub type RestResult<T> = Result<T, RestError>;

#[derive(Debug, Clone, Error)]
pub enum RestError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Bucket does not exist
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    // ==================
    // Server Errors (5xx)
    // ==================
    /// Body is not JSON
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Request JSON did not describe a statement
    #[error("{0}")]
    Statement(#[from] AstError),

    /// Statement could not be planned
    #[error("{0}")]
    Planning(PlannerError),
}

impl RestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RestError::InvalidBody(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RestError::CollectionNotFound(_) => StatusCode::NOT_FOUND,
            RestError::Statement(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RestError::Planning(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PlannerError> for RestError {
    fn from(err: PlannerError) -> Self {
        if err.is_not_found() {
            RestError::CollectionNotFound(err.message().to_string())
        } else {
            RestError::Planning(err)
        }
    }
}

impl From<DataSourceError> for RestError {
    fn from(err: DataSourceError) -> Self {
        PlannerError::from(err).into()
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl From<RestError> for ErrorResponse {
    fn from(err: RestError) -> Self {
        Self {
            code: err.status_code().as_u16(),
            error: err.to_string(),
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse::from(self));
        (status, body).into_response()
    }
}
