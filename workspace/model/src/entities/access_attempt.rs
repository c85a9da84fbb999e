use chrono::{Duration, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{Condition, QueryOrder, Set};

use crate::active_value;
use crate::error::Result;

/// Failed login counter for one username and client address.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "access_attempts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub username: String,
    pub ip_address: String,
    pub failures: i32,
    pub last_failure_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> std::result::Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if insert && active_value(&self.created_at).is_none() {
            self.created_at = Set(Utc::now());
        }
        Ok(self)
    }
}

impl Model {
    /// Whether the counter reached `limit` within the cool-off window.
    pub fn is_locked(&self, limit: i32, cooloff: Duration) -> bool {
        self.failures >= limit && self.last_failure_at + cooloff > Utc::now()
    }

    /// When the lock lifts.
    pub fn locked_until(&self, cooloff: Duration) -> DateTimeUtc {
        self.last_failure_at + cooloff
    }
}

fn normalize(username: &str) -> String {
    username.trim().to_lowercase()
}

async fn find<C: ConnectionTrait>(db: &C, username: &str, ip_address: &str) -> Result<Option<Model>> {
    Ok(Entity::find()
        .filter(Column::Username.eq(normalize(username)))
        .filter(Column::IpAddress.eq(ip_address))
        .one(db)
        .await?)
}

/// Counts one more failed login.
///
/// A counter whose cool-off already expired starts again from one.
pub async fn record_failure<C: ConnectionTrait>(
    db: &C,
    username: &str,
    ip_address: &str,
    cooloff: Duration,
) -> Result<Model> {
    let now = Utc::now();
    match find(db, username, ip_address).await? {
        Some(attempt) => {
            let failures = if attempt.last_failure_at + cooloff <= now {
                1
            } else {
                attempt.failures + 1
            };
            let mut active: ActiveModel = attempt.into();
            active.failures = Set(failures);
            active.last_failure_at = Set(now);
            Ok(active.update(db).await?)
        }
        None => Ok(ActiveModel {
            username: Set(normalize(username)),
            ip_address: Set(ip_address.to_string()),
            failures: Set(1),
            last_failure_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?),
    }
}

/// When the lock on this login lifts, if one is in force.
///
/// Failures are counted per username across addresses and per address
/// across usernames; either reaching `limit` inside the window locks.
pub async fn active_lock<C: ConnectionTrait>(
    db: &C,
    username: &str,
    ip_address: &str,
    limit: i32,
    cooloff: Duration,
) -> Result<Option<DateTimeUtc>> {
    let username = normalize(username);
    let recent = Entity::find()
        .filter(
            Condition::any()
                .add(Column::Username.eq(username.clone()))
                .add(Column::IpAddress.eq(ip_address)),
        )
        .filter(Column::LastFailureAt.gt(Utc::now() - cooloff))
        .all(db)
        .await?;

    let by_username: i32 = recent.iter().filter(|a| a.username == username).map(|a| a.failures).sum();
    let by_address: i32 = recent.iter().filter(|a| a.ip_address == ip_address).map(|a| a.failures).sum();
    if by_username < limit && by_address < limit {
        return Ok(None);
    }
    Ok(recent.iter().map(|a| a.locked_until(cooloff)).max())
}

/// Forgets the failures after a successful login.
pub async fn reset<C: ConnectionTrait>(db: &C, username: &str, ip_address: &str) -> Result<()> {
    Entity::delete_many()
        .filter(Column::Username.eq(normalize(username)))
        .filter(Column::IpAddress.eq(ip_address))
        .exec(db)
        .await?;
    Ok(())
}

/// Counters currently locking someone out, most recent first.
pub async fn locked<C: ConnectionTrait>(db: &C, limit: i32, cooloff: Duration) -> Result<Vec<Model>> {
    let since = Utc::now() - cooloff;
    Ok(Entity::find()
        .filter(Column::Failures.gte(limit))
        .filter(Column::LastFailureAt.gt(since))
        .order_by_desc(Column::LastFailureAt)
        .all(db)
        .await?)
}

/// Removes every counter for a username. Returns how many were dropped.
pub async fn unlock_username<C: ConnectionTrait>(db: &C, username: &str) -> Result<u64> {
    let result = Entity::delete_many()
        .filter(Column::Username.eq(normalize(username)))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Removes every counter for a client address.
pub async fn unlock_ip<C: ConnectionTrait>(db: &C, ip_address: &str) -> Result<u64> {
    let result = Entity::delete_many()
        .filter(Column::IpAddress.eq(ip_address))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Removes every counter.
pub async fn clear_all<C: ConnectionTrait>(db: &C) -> Result<u64> {
    Ok(Entity::delete_many().exec(db).await?.rows_affected)
}
