//! Error handling module for the wine backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and response bodies.

mod validation;

pub use validation::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::db::StoreError;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const UNKNOWN_OBJECT: &str = "UNKNOWN_OBJECT";
    pub const STORE_ERROR: &str = "STORE_ERROR";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// One or more fields failed the wine schema
    Validation(ValidationErrors),
    /// Referenced wine does not exist
    UnknownObject,
    /// Unclassified store error, forwarded as is
    Store(StoreError),
    /// Request body is not a JSON object
    BadRequest(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    ///
    /// Unknown objects answer 400 rather than 404; existing clients rely on it.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::UnknownObject => StatusCode::BAD_REQUEST,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::UnknownObject => codes::UNKNOWN_OBJECT,
            AppError::Store(_) => codes::STORE_ERROR,
            AppError::BadRequest(_) => codes::BAD_REQUEST,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Store(err) => write!(f, "{}: {}", self.error_code(), err),
            AppError::BadRequest(msg) => write!(f, "{}: {}", self.error_code(), msg),
            _ => write!(f, "{}", self.error_code()),
        }
    }
}

impl std::error::Error for AppError {}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::debug!("JSON error: {:?}", err);
        AppError::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        tracing::error!("Store error: {:?}", err);
        AppError::Store(err)
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse<'a> {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<&'a ValidationErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<'a> ErrorResponse<'a> {
    pub fn new(error: &'a AppError) -> Self {
        let (validation, message) = match error {
            AppError::Validation(errors) => (Some(errors), None),
            AppError::UnknownObject => (None, None),
            AppError::Store(err) => (None, Some(err.to_string())),
            AppError::BadRequest(msg) => (None, Some(msg.clone())),
        };

        Self {
            error: error.error_code(),
            validation,
            message,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(ErrorResponse::new(&self))).into_response()
    }
}
