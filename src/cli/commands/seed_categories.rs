use anyhow::Result;
use model::entities::category;
use tracing::{debug, info, trace};

use super::connect;

pub async fn seed_categories(database_url: &str) -> Result<()> {
    trace!("Entering seed_categories function");
    info!("Seeding system categories");

    let db = connect(database_url).await?;
    let report = category::seed_system_categories(&db).await?;

    for name in &report.created {
        info!("Created system category {}", name);
    }
    debug!("{} system categories already present", report.existing.len());
    info!(
        "Seeding completed: {} created, {} already existed",
        report.created.len(),
        report.existing.len()
    );
    Ok(())
}
