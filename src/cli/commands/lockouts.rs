use anyhow::Result;
use model::entities::access_attempt;
use sea_orm::{EntityTrait, QueryOrder};
use tracing::{info, warn};

use super::connect;
use crate::config::Settings;
use crate::logging::SECURITY_TARGET;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockoutAction {
    ListFailures,
    ListBlocked,
    Clear,
    UnlockIp(String),
    UnlockUser(String),
}

fn print_rows(rows: &[access_attempt::Model], settings: &Settings) {
    if rows.is_empty() {
        println!("No records");
        return;
    }
    let cooloff = settings.auth.cooloff();
    println!("{:<24} {:<40} {:>8} {:<25} {}", "USERNAME", "IP", "FAILURES", "LAST FAILURE", "LOCKED");
    for row in rows {
        let locked = if row.is_locked(settings.auth.failure_limit, cooloff) {
            format!("until {}", row.locked_until(cooloff).format("%Y-%m-%d %H:%M:%S"))
        } else {
            "no".to_string()
        };
        println!(
            "{:<24} {:<40} {:>8} {:<25} {}",
            row.username,
            row.ip_address,
            row.failures,
            row.last_failure_at.format("%Y-%m-%d %H:%M:%S"),
            locked
        );
    }
}

pub async fn lockouts(settings: &Settings, action: LockoutAction) -> Result<()> {
    let db = connect(&settings.database_url).await?;

    match action {
        LockoutAction::ListFailures => {
            let rows = access_attempt::Entity::find()
                .order_by_desc(access_attempt::Column::LastFailureAt)
                .all(&db)
                .await?;
            print_rows(&rows, settings);
        }
        LockoutAction::ListBlocked => {
            let rows = access_attempt::locked(&db, settings.auth.failure_limit, settings.auth.cooloff()).await?;
            print_rows(&rows, settings);
        }
        LockoutAction::Clear => {
            let removed = access_attempt::clear_all(&db).await?;
            warn!(target: SECURITY_TARGET, event = "lockouts_cleared", removed, "All login lockouts cleared");
            println!("Removed {} records", removed);
        }
        LockoutAction::UnlockIp(ip) => {
            let removed = access_attempt::unlock_ip(&db, &ip).await?;
            info!(target: SECURITY_TARGET, event = "unlock_ip", ip = %ip, removed, "Address unlocked");
            println!("Removed {} records for {}", removed, ip);
        }
        LockoutAction::UnlockUser(username) => {
            let removed = access_attempt::unlock_username(&db, &username).await?;
            info!(target: SECURITY_TARGET, event = "unlock_user", username = %username, removed, "Username unlocked");
            println!("Removed {} records for {}", removed, username);
        }
    }
    Ok(())
}
