//! REST API module.
//!
//! Handlers for the `/wines` resource.

mod wines;

pub use wines::*;

use axum::body::Bytes;
use serde_json::{Map, Value};

use crate::errors::AppError;

/// Parse a request body into a JSON object. An empty body counts as `{}`.
pub fn parse_object_body(body: &Bytes) -> Result<Map<String, Value>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    match serde_json::from_slice::<Value>(body)? {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::BadRequest(
            "Request body must be a JSON object".to_string(),
        )),
    }
}

/// Parse a wine id from the path. Ids that are not integers cannot exist.
pub fn parse_wine_id(raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>().map_err(|_| AppError::UnknownObject)
}
