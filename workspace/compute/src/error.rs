use model::ModelError;
use thiserror::Error;

/// Error types for the compute module
#[derive(Error, Debug)]
pub enum ComputeError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Error raised by the data layer (validation, ownership, ...)
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Month or year outside the accepted range
    #[error("Invalid period: {0}")]
    Period(String),
}

/// Type alias for Result with ComputeError
pub type Result<T> = std::result::Result<T, ComputeError>;
