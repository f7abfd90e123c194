//! Keyset record endpoints.

use axum::{extract::Path, http::StatusCode, Json};
use serde::Serialize;

use super::{api_error, internal_error, ApiError};
use crate::store::{self, Keyset, StoreError, RECORD_STORE};

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub imported: usize,
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub id: String,
    pub replaced: bool,
}

/// 400 for rejected input, 500 for storage failures.
fn store_error(context: &str, error: StoreError) -> ApiError {
    if error.is_invalid_input() {
        api_error(StatusCode::BAD_REQUEST, error)
    } else {
        internal_error(context, error)
    }
}

/// GET /api/keysets - Every keyset in the record set.
pub async fn get_keysets() -> Result<Json<Vec<Keyset>>, ApiError> {
    let store = RECORD_STORE
        .read()
        .map_err(|e| internal_error("Failed to read keysets", e))?;
    Ok(Json(store.keysets().to_vec()))
}

/// POST /api/keysets - Replace the record set with the posted array.
pub async fn import_keysets(
    Json(keysets): Json<Vec<Keyset>>,
) -> Result<Json<ImportResponse>, ApiError> {
    let imported =
        store::import_keysets(keysets).map_err(|e| store_error("Failed to import keysets", e))?;
    Ok(Json(ImportResponse { imported }))
}

/// PUT /api/keysets/:id - Insert or replace one keyset.
pub async fn put_keyset(
    Path(id): Path<String>,
    Json(mut keyset): Json<Keyset>,
) -> Result<Json<SaveResponse>, ApiError> {
    if id.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "keyset id is required"));
    }
    keyset.id = id;

    let id = keyset.id.clone();
    let replaced =
        store::save_keyset(keyset).map_err(|e| store_error("Failed to save keyset", e))?;
    Ok(Json(SaveResponse { id, replaced }))
}

/// DELETE /api/keysets/:id - Remove one keyset.
pub async fn delete_keyset(Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    let removed =
        store::delete_keyset(&id).map_err(|e| internal_error("Failed to delete keyset", e))?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(api_error(
            StatusCode::NOT_FOUND,
            format!("no keyset with id `{id}`"),
        ))
    }
}
