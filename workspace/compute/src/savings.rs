use common::{SavingProgress, SavingsSummary};
use model::entities::saving::{self, SavingStatus};
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, PaginatorTrait};

use crate::error::Result;

pub fn saving_progress(saving: &saving::Model) -> SavingProgress {
    SavingProgress {
        id: saving.id,
        name: saving.name.clone(),
        icon: saving.icon.clone(),
        color: saving.color.clone(),
        currency: saving.currency.code().to_string(),
        target_amount: saving.target_amount,
        current_amount: saving.current_amount,
        progress: saving.progress_percentage(),
        target_date: saving.target_date,
    }
}

/// Totals over a set of active goals.
pub fn summarize(active: &[saving::Model], completed_count: usize) -> SavingsSummary {
    let total_target: Decimal = active.iter().map(|s| s.target_amount).sum();
    let total_current: Decimal = active.iter().map(|s| s.current_amount).sum();

    SavingsSummary {
        total_target,
        total_current,
        total_remaining: (total_target - total_current).max(Decimal::ZERO),
        overall_progress: common::percentage_1dp(total_current, total_target).min(Decimal::ONE_HUNDRED),
        active_count: active.len(),
        completed_count,
    }
}

/// Summary of the user's savings: totals over ACTIVE goals plus how many
/// goals are COMPLETED.
pub async fn savings_summary<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<SavingsSummary> {
    let active = saving::for_user(user_id, Some(SavingStatus::Active)).all(db).await?;
    let completed = saving::for_user(user_id, Some(SavingStatus::Completed)).count(db).await?;
    Ok(summarize(&active, completed as usize))
}
