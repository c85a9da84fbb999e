use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use compute::ComputeError;
use model::ModelError;
use sea_orm::DbErr;
use thiserror::Error;
use tracing::{error, warn};

use crate::logging::SECURITY_TARGET;
use crate::schemas::ErrorResponse;

/// Errors returned by the HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        available: rust_decimal::Decimal,
        requested: rust_decimal::Decimal,
    },

    #[error("Too many failed login attempts, try again after {until}")]
    Locked { until: DateTime<Utc> },

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation { .. } | ApiError::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Locked { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            ApiError::Locked { .. } => "TOO_MANY_ATTEMPTS",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Database(db_err) => db_err.into(),
            ModelError::Validation { field, message } => ApiError::Validation { field, message },
            ModelError::NotFound(what) => ApiError::NotFound(what),
            ModelError::PermissionDenied(message) => ApiError::Forbidden(message),
            ModelError::Conflict(message) => ApiError::Conflict(message),
            ModelError::InsufficientFunds { available, requested } => ApiError::InsufficientFunds { available, requested },
        }
    }
}

impl From<ComputeError> for ApiError {
    fn from(err: ComputeError) -> Self {
        match err {
            ComputeError::Database(db_err) => db_err.into(),
            ComputeError::Model(model_err) => model_err.into(),
            ComputeError::Period(message) => ApiError::BadRequest(format!("Invalid period: {}", message)),
        }
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        error!("Database error: {}", err);
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Internal(detail) => error!("Request failed: {}", detail),
            ApiError::Forbidden(message) => {
                warn!(target: SECURITY_TARGET, event = "permission_denied", "Permission denied: {}", message)
            }
            other => warn!("Request rejected with {}: {}", status, other),
        }
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
            success: false,
        };
        (status, Json(body)).into_response()
    }
}
