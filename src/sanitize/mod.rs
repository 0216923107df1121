//! Request sanitization against store operator injection.
//!
//! The store's query language introduces operators with `$`. Every `$` is removed from
//! request paths, query parameters and JSON bodies (string values and object keys alike)
//! before any handler sees them.

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header, uri::PathAndQuery, HeaderValue, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};

use crate::errors::AppError;

/// Character that introduces store operators.
pub const MARKER: char = '$';

const ENCODED_MARKER: &str = "%24";

/// Bodies larger than this are rejected before sanitization.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Remove every marker from `text`.
pub fn sanitize_str(text: &str) -> String {
    text.replace(MARKER, "")
}

/// Remove markers from every string and object key in `value`, at any depth.
///
/// Keys that collide after sanitization keep the last value.
pub fn sanitize_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_str(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (sanitize_str(&key), sanitize_value(value)))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

/// Sanitize a raw query string. Returns `None` when nothing needs to change.
pub fn sanitize_query(query: &str) -> Option<String> {
    if !query.contains(MARKER) && !query.contains(ENCODED_MARKER) {
        return None;
    }

    let pairs = url::form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| (sanitize_str(&key), sanitize_str(&value)));
    Some(
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish(),
    )
}

/// Remove literal and percent-encoded markers from a request path.
pub fn sanitize_path(path: &str) -> String {
    let mut cleaned = path.to_string();
    // Removing one encoded marker can expose another (`%2%244`), so repeat until stable.
    while cleaned.contains(MARKER) || cleaned.contains(ENCODED_MARKER) {
        cleaned = cleaned.replace(MARKER, "").replace(ENCODED_MARKER, "");
    }
    cleaned
}

fn sanitize_uri(uri: &Uri) -> Result<Option<Uri>, axum::http::Error> {
    let path = uri.path();
    let query = uri.query();

    let clean_path = sanitize_path(path);
    let clean_query = query.and_then(sanitize_query);
    if clean_path == path && clean_query.is_none() {
        return Ok(None);
    }

    let path_and_query = match clean_query.as_deref().or(query) {
        Some(q) => format!("{}?{}", clean_path, q),
        None => clean_path,
    };

    rebuild_uri(uri, path_and_query).map(Some)
}

fn rebuild_uri(uri: &Uri, path_and_query: String) -> Result<Uri, axum::http::Error> {
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query)?);
    Ok(Uri::from_parts(parts)?)
}

/// Middleware rewriting the request URI and any JSON body with markers removed.
///
/// Bodies are sanitized whenever they parse as JSON, whatever their declared content type,
/// since handlers parse them regardless. Must wrap the router so that routing and extraction
/// only see sanitized data.
pub async fn sanitize_request(request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    match sanitize_uri(&parts.uri) {
        Ok(Some(uri)) => {
            tracing::debug!("Sanitized request uri {} -> {}", parts.uri, uri);
            parts.uri = uri;
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!("Failed to rebuild sanitized uri {}: {}", parts.uri, e);
            return AppError::BadRequest(format!("Invalid request uri: {}", e)).into_response();
        }
    }

    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to read request body: {}", e);
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    if bytes.is_empty() {
        return next.run(Request::from_parts(parts, Body::from(bytes))).await;
    }

    // Bodies that are not JSON are forwarded untouched; handlers reject them.
    let body = match serde_json::from_slice::<Value>(&bytes) {
        Ok(value) => match serde_json::to_vec(&sanitize_value(value)) {
            Ok(cleaned) => {
                parts
                    .headers
                    .insert(header::CONTENT_LENGTH, HeaderValue::from(cleaned.len()));
                Body::from(cleaned)
            }
            Err(_) => Body::from(bytes),
        },
        Err(_) => Body::from(bytes),
    };

    next.run(Request::from_parts(parts, body)).await
}
