//! Wine API endpoints.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};

use super::{parse_object_body, parse_wine_id};
use crate::db::WineQuery;
use crate::errors::{convert_to_validation_error, AppError};
use crate::models::{DeleteResponse, Wine, WineListParams};
use crate::AppState;

/// GET /wines - List wines matching the optional name, country, type and year filters.
pub async fn find_wines(
    State(state): State<AppState>,
    Query(params): Query<WineListParams>,
) -> Result<Json<Vec<Wine>>, AppError> {
    let wines = WineQuery::from_params(&params).find(&state.repo).await?;
    Ok(Json(wines))
}

/// POST /wines - Create a new wine.
pub async fn add_wine(State(state): State<AppState>, body: Bytes) -> Result<Json<Wine>, AppError> {
    let doc = parse_object_body(&body)?;

    let wine = state
        .repo
        .create(&doc)
        .await
        .map_err(convert_to_validation_error)?;

    tracing::info!(target: "audit", wine_id = wine.id, "wine created");
    Ok(Json(wine))
}

/// PUT /wines/:id - Update the given fields of a wine.
pub async fn modify_wine(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Wine>, AppError> {
    let id = parse_wine_id(&id)?;
    let changes = parse_object_body(&body)?;

    let existing = state
        .repo
        .find_by_id(id)
        .await?
        .ok_or(AppError::UnknownObject)?;

    let wine = state
        .repo
        .update_with(&existing, &changes)
        .await
        .map_err(convert_to_validation_error)?
        .ok_or(AppError::UnknownObject)?;

    if !changes.is_empty() {
        tracing::info!(target: "audit", wine_id = wine.id, "wine updated");
    }
    Ok(Json(wine))
}

/// GET /wines/:id - Get a single wine.
pub async fn get_wine(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Wine>, AppError> {
    let id = parse_wine_id(&id)?;

    match state.repo.find_by_id(id).await? {
        Some(wine) => Ok(Json(wine)),
        None => Err(AppError::UnknownObject),
    }
}

/// DELETE /wines/:id - Delete a wine.
pub async fn delete_wine(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let id = parse_wine_id(&id)?;

    match state.repo.find_by_id_and_remove(id).await? {
        Some(wine) => {
            tracing::info!(target: "audit", wine_id = wine.id, "wine deleted");
            Ok(Json(DeleteResponse { success: true }))
        }
        None => Err(AppError::UnknownObject),
    }
}
