pub mod currency;
pub mod entities;
pub mod error;
pub mod soft_delete;
pub mod sync;

pub use error::{ModelError, Result};
pub use soft_delete::SoftDelete;

// Re-export tracing for use in this crate
pub use tracing;

use sea_orm::ActiveValue;

/// Reads the value held by an active model field, if it was loaded or set.
pub(crate) fn active_value<T: Clone + Into<sea_orm::Value>>(value: &ActiveValue<T>) -> Option<T> {
    match value {
        ActiveValue::Set(v) | ActiveValue::Unchanged(v) => Some(v.clone()),
        ActiveValue::NotSet => None,
    }
}
