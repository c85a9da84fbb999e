pub mod ensure_superuser;
pub mod generate_secret_key;
pub mod initdb;
pub mod lockouts;
pub mod migrate_and_serve;
pub mod seed_categories;
pub mod serve;
pub mod view_logs;

pub use ensure_superuser::ensure_superuser;
pub use generate_secret_key::{generate_secret_key, SecretFormat};
pub use initdb::init_database;
pub use lockouts::{lockouts, LockoutAction};
pub use migrate_and_serve::migrate_and_serve;
pub use seed_categories::seed_categories;
pub use serve::serve;
pub use view_logs::view_logs;

use anyhow::Result;
use sea_orm::{Database, DatabaseConnection};
use tracing::{debug, error, info, trace};

/// Opens a connection for a maintenance command.
pub(crate) async fn connect(database_url: &str) -> Result<DatabaseConnection> {
    trace!("Attempting to connect to database");
    debug!("Database URL: {}", database_url);
    match Database::connect(database_url).await {
        Ok(connection) => {
            info!("Successfully connected to database");
            Ok(connection)
        }
        Err(e) => {
            error!("Failed to connect to database '{}': {}", database_url, e);
            Err(e.into())
        }
    }
}
