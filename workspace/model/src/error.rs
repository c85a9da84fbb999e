use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by the data layer: database failures plus the business rule
/// violations checked before a row is written.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A field failed validation
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    /// Referenced record does not exist or is not visible to the user
    #[error("{0} not found")]
    NotFound(String),

    /// Record exists but the user may not modify it
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Record collides with an existing one
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Withdrawal larger than the saving's balance
    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: Decimal, requested: Decimal },
}

impl ModelError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ModelError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Type alias for Result with ModelError
pub type Result<T, E = ModelError> = std::result::Result<T, E>;
