//! Error types shared across the ledger service.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::transitions::TransitionError;
use crate::validation::ValidationErrors;

/// Failures of the embedded backend store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Sled(#[from] sled::Error),

    #[error("record encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bet {0} not found")]
    BetNotFound(Uuid),

    #[error("amounts of bet {0} are out of range")]
    AmountOverflow(Uuid),

    #[error("blocking store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("utc offset out of range: {0} minutes")]
    OffsetOutOfRange(i32),
}

/// Errors surfaced by the HTTP layer.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthorized,

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("bet {0} not found")]
    NotFound(Uuid),

    #[error("another action on bet {0} is still in progress")]
    Busy(Uuid),

    #[error("backend call failed")]
    Backend(#[source] StoreError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::BetNotFound(id) => ApiError::NotFound(id),
            StoreError::AmountOverflow(_) => {
                ApiError::Validation(ValidationErrors::single("units", "bet amounts are out of range"))
            }
            other => ApiError::Backend(other),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Transition(TransitionError::NotConfirmed) => StatusCode::PRECONDITION_REQUIRED,
            ApiError::Transition(
                TransitionError::MissingCashoutValue | TransitionError::InvalidCashoutValue,
            ) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Transition(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Busy(_) => StatusCode::CONFLICT,
            ApiError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            ApiError::Validation(errors) => json!({
                "success": false,
                "error": self.to_string(),
                "fields": errors.fields,
            }),
            ApiError::Backend(source) => {
                // Internals stay in the log, the caller gets a generic message.
                tracing::error!(error = %source, "backend call failed");
                json!({ "success": false, "error": self.to_string() })
            }
            _ => json!({ "success": false, "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
