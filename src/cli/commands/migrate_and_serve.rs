use anyhow::Result;
use tracing::{debug, info, trace};

use super::initdb::run_migrations;
use super::{connect, serve};
use crate::config::Settings;

pub async fn migrate_and_serve(settings: Settings) -> Result<()> {
    trace!("Entering migrate_and_serve function");
    info!("Applying database migrations and starting server");
    debug!("Bind address: {}", settings.bind_address);

    let db = connect(&settings.database_url).await?;
    run_migrations(&db).await?;
    drop(db);

    serve(settings).await
}
