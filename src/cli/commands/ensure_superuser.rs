use anyhow::{bail, Context, Result};
use model::entities::user;
use sea_orm::{ActiveModelBehavior, ActiveModelTrait, ConnectionTrait, Set};
use tracing::{info, trace};

use super::connect;
use crate::auth::hash_password;
use crate::logging::SECURITY_TARGET;

fn required_env(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("{} must be set", name))
}

/// Creates the administrator, or promotes and resets the password of the
/// existing user with that username. Returns whether one was created.
pub(crate) async fn upsert_superuser<C: ConnectionTrait>(
    db: &C,
    username: &str,
    email: &str,
    password: &str,
) -> Result<bool> {
    user::validate_registration(username, email, password, password)?;

    if let Some(existing) = user::find_by_login(db, username.trim()).await? {
        let mut active: user::ActiveModel = existing.into();
        active.password_hash = Set(hash_password(password)?);
        active.is_staff = Set(true);
        active.is_superuser = Set(true);
        active.is_active = Set(true);
        let updated = active.update(db).await?;
        info!(target: SECURITY_TARGET, event = "superuser_updated", user_id = updated.id, username = %updated.username, "Superuser updated");
        return Ok(false);
    }
    if user::email_taken(db, email, None).await? {
        bail!("Email {} already belongs to another user", email);
    }

    let mut active = <user::ActiveModel as ActiveModelBehavior>::new();
    active.username = Set(username.trim().to_string());
    active.email = Set(email.trim().to_lowercase());
    active.password_hash = Set(hash_password(password)?);
    active.is_staff = Set(true);
    active.is_superuser = Set(true);
    let created = active.insert(db).await?;

    info!(target: SECURITY_TARGET, event = "superuser_created", user_id = created.id, username = %created.username, "Superuser created");
    Ok(true)
}

pub async fn ensure_superuser(database_url: &str) -> Result<()> {
    trace!("Entering ensure_superuser function");
    let username = required_env("CASHBOOK_SUPERUSER_USERNAME")?;
    let email = required_env("CASHBOOK_SUPERUSER_EMAIL")?;
    let password = required_env("CASHBOOK_SUPERUSER_PASSWORD")?;

    let db = connect(database_url).await?;
    if upsert_superuser(&db, &username, &email, &password).await? {
        println!("Superuser {} created", username);
    } else {
        println!("Superuser {} updated", username);
    }
    Ok(())
}
