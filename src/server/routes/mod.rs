//! Route handlers module.

pub mod config;
pub mod health;
pub mod keysets;
pub mod statistics;

use axum::{http::StatusCode, Json};
use serde::Serialize;

/// JSON body returned with every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

pub fn api_error(status: StatusCode, message: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
}

/// Logs a server-side failure and hides its details from the client.
pub fn internal_error(context: &str, error: impl std::fmt::Display) -> ApiError {
    tracing::error!(%error, "{}", context);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, context)
}
