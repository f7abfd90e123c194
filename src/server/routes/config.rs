//! Configuration endpoints.

use axum::{http::StatusCode, Json};
use serde::Deserialize;

use super::{api_error, internal_error, ApiError};
use crate::database::ConfigEntry;
use crate::statistics::Selection;
use crate::store::{broadcast_statistics, DATABASE};

#[derive(Debug, serde::Serialize)]
pub struct ConfigResponse {
    pub settings: Vec<ConfigEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ConfigUpdate {
    pub key: String,
    pub value: String,
}

/// Rejects values a statistics setting could not be read back from.
pub fn validate_setting(key: &str, value: &str) -> Result<(), ApiError> {
    Selection::default()
        .apply(key, value)
        .map(|_| ())
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))
}

/// GET /api/config - Get all configuration settings
pub async fn get_config() -> Result<Json<ConfigResponse>, ApiError> {
    let db = DATABASE
        .as_ref()
        .ok_or_else(|| api_error(StatusCode::SERVICE_UNAVAILABLE, "no database"))?
        .lock()
        .map_err(|e| internal_error("Database lock poisoned", e))?;

    let settings = db
        .get_all_config()
        .map_err(|e| internal_error("Failed to fetch config", e))?;
    Ok(Json(ConfigResponse { settings }))
}

/// POST /api/config - Update one setting and push fresh statistics.
pub async fn set_config(
    Json(update): Json<ConfigUpdate>,
) -> Result<Json<ConfigResponse>, ApiError> {
    validate_setting(&update.key, &update.value)?;

    let settings = {
        let db = DATABASE
            .as_ref()
            .ok_or_else(|| api_error(StatusCode::SERVICE_UNAVAILABLE, "no database"))?
            .lock()
            .map_err(|e| internal_error("Database lock poisoned", e))?;

        db.set_config(&update.key, &update.value)
            .map_err(|e| internal_error("Failed to update config", e))?;
        db.get_all_config()
            .map_err(|e| internal_error("Failed to fetch config", e))?
    };

    tracing::info!(key = %update.key, value = %update.value, "Config updated");
    broadcast_statistics();
    Ok(Json(ConfigResponse { settings }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_setting() {
        assert!(validate_setting("status_dimension", "designer").is_ok());
        assert!(validate_setting("import_path", "/tmp/keysets.json").is_ok());

        let (status, body) = validate_setting("sort_status", "sideways").unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.contains("sideways"));
    }
}
