//! Keeps savings goals in step with the expenses tagged to them.
//!
//! An expense linked to a saving is mirrored by movements on that saving,
//! each carrying the expense id. The amount currently mirrored is the net of
//! those movements, so any later change only has to post the difference:
//!
//! * create: deposit the expense amount into the linked saving
//! * update on the same saving: post the delta (deposit or withdrawal)
//! * update to another saving or unlink: withdraw the net from the old one,
//!   deposit into the new one
//! * soft delete: withdraw the net
//!
//! Reversals never overdraw a goal; when the user already spent part of the
//! mirrored money the reversal is clamped to the available balance.

use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use tracing::{debug, instrument, warn};

use crate::currency::Currency;
use crate::entities::saving::{self, SavingStatus};
use crate::entities::saving_movement::{self, MovementType};
use crate::entities::expense;
use crate::error::{ModelError, Result};
use crate::soft_delete::SoftDelete;

/// Net amount currently mirrored from an expense onto a saving.
pub async fn net_synced_amount<C: ConnectionTrait>(db: &C, expense_id: i32, saving_id: i32) -> Result<Decimal> {
    let movements = saving_movement::Entity::find()
        .filter(saving_movement::Column::ExpenseId.eq(expense_id))
        .filter(saving_movement::Column::SavingId.eq(saving_id))
        .all(db)
        .await?;
    Ok(movements.iter().map(|m| m.signed_amount()).sum())
}

/// Expense amount expressed in the saving's currency.
pub fn amount_in_saving_currency(expense: &expense::Model, saving: &saving::Model) -> Result<Decimal> {
    if expense.currency == saving.currency {
        return Ok(expense.amount);
    }
    match saving.currency {
        Currency::Ars => Ok(expense.amount_ars),
        _ => Err(ModelError::validation(
            "saving_id",
            format!(
                "Cannot link a {} expense to a {} saving",
                expense.currency.code(),
                saving.currency.code()
            ),
        )),
    }
}

/// Loads a saving an expense may be linked to: owned, not deleted, ACTIVE.
pub async fn linkable_saving<C: ConnectionTrait>(db: &C, user_id: i32, saving_id: i32) -> Result<saving::Model> {
    let saving = saving::Entity::find_active()
        .filter(saving::Column::Id.eq(saving_id))
        .filter(saving::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| ModelError::validation("saving_id", "Invalid saving"))?;
    if saving.status != SavingStatus::Active {
        return Err(ModelError::validation("saving_id", "Only active savings can receive expenses"));
    }
    Ok(saving)
}

/// Brings the saving side in line with an expense transition.
///
/// `previous` is the expense as stored before the change (None on create),
/// `current` the expense after it (None on soft delete).
#[instrument(skip_all, fields(
    expense_id = previous.or(current).map(|e| e.id),
    from_saving = previous.and_then(|e| e.saving_id),
    to_saving = current.and_then(|e| e.saving_id),
))]
pub async fn sync_expense<C: ConnectionTrait>(
    db: &C,
    previous: Option<&expense::Model>,
    current: Option<&expense::Model>,
) -> Result<()> {
    let old_saving = previous.and_then(|e| e.saving_id);
    let new_saving = current.and_then(|e| e.saving_id);

    if let (Some(old_id), Some(expense)) = (old_saving, previous) {
        if Some(old_id) != new_saving {
            reverse(db, expense, old_id).await?;
        }
    }

    if let (Some(new_id), Some(expense)) = (new_saving, current) {
        let saving = linkable_saving(db, expense.user_id, new_id).await?;
        let target = amount_in_saving_currency(expense, &saving)?;
        let already = net_synced_amount(db, expense.id, new_id).await?;
        let delta = target - already;

        if delta > Decimal::ZERO {
            saving::post_movement(
                db,
                new_id,
                MovementType::Deposit,
                delta,
                &format!("Gasto: {}", expense.description),
                Some(expense.id),
            )
            .await?;
        } else if delta < Decimal::ZERO {
            withdraw_clamped(db, new_id, -delta, &format!("Ajuste gasto: {}", expense.description), expense.id).await?;
        } else {
            debug!("Saving {} already mirrors expense {}", new_id, expense.id);
        }
    }

    Ok(())
}

async fn reverse<C: ConnectionTrait>(db: &C, expense: &expense::Model, saving_id: i32) -> Result<()> {
    let net = net_synced_amount(db, expense.id, saving_id).await?;
    if net <= Decimal::ZERO {
        return Ok(());
    }
    withdraw_clamped(
        db,
        saving_id,
        net,
        &format!("Reverso gasto: {}", expense.description),
        expense.id,
    )
    .await
}

async fn withdraw_clamped<C: ConnectionTrait>(
    db: &C,
    saving_id: i32,
    amount: Decimal,
    description: &str,
    expense_id: i32,
) -> Result<()> {
    let Some(saving) = saving::Entity::find_by_id(saving_id).one(db).await? else {
        warn!("Saving {} vanished, skipping reversal of expense {}", saving_id, expense_id);
        return Ok(());
    };

    let amount_to_withdraw = amount.min(saving.current_amount);
    if amount_to_withdraw < amount {
        warn!(
            "Clamping reversal of expense {} on saving {}: requested {}, available {}",
            expense_id, saving_id, amount, saving.current_amount
        );
    }
    if amount_to_withdraw <= Decimal::ZERO {
        return Ok(());
    }

    saving::post_movement(
        db,
        saving_id,
        MovementType::Withdrawal,
        amount_to_withdraw,
        description,
        Some(expense_id),
    )
    .await?;
    Ok(())
}
