use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Select, UpdateMany};

/// Entities whose rows are hidden instead of removed.
///
/// Soft-deleted rows keep `is_active = false` and a `deleted_at` timestamp.
/// `find_active` is the default accessor for application queries; the
/// other accessors exist for audit and recovery.
pub trait SoftDelete: EntityTrait {
    fn id_column() -> Self::Column;
    fn is_active_column() -> Self::Column;
    fn deleted_at_column() -> Self::Column;

    /// Rows that have not been soft deleted.
    fn find_active() -> Select<Self> {
        Self::find().filter(Self::is_active_column().eq(true))
    }

    /// Every row, deleted or not.
    fn find_all_with_deleted() -> Select<Self> {
        Self::find()
    }

    fn find_deleted_only() -> Select<Self> {
        Self::find().filter(Self::is_active_column().eq(false))
    }

    /// Statement that marks one row as deleted.
    fn soft_delete_by_id(id: i32) -> UpdateMany<Self> {
        Self::update_many()
            .col_expr(Self::is_active_column(), Expr::value(false))
            .col_expr(Self::deleted_at_column(), Expr::value(Utc::now()))
            .filter(Self::id_column().eq(id))
    }

    /// Statement that brings a soft-deleted row back.
    fn restore_by_id(id: i32) -> UpdateMany<Self> {
        Self::update_many()
            .col_expr(Self::is_active_column(), Expr::value(true))
            .col_expr(Self::deleted_at_column(), Expr::value(Option::<chrono::DateTime<Utc>>::None))
            .filter(Self::id_column().eq(id))
    }
}

/// Implements [`SoftDelete`] for an entity module with the standard columns.
macro_rules! impl_soft_delete {
    ($module:ident) => {
        impl $crate::soft_delete::SoftDelete for $module::Entity {
            fn id_column() -> $module::Column {
                $module::Column::Id
            }
            fn is_active_column() -> $module::Column {
                $module::Column::IsActive
            }
            fn deleted_at_column() -> $module::Column {
                $module::Column::DeletedAt
            }
        }
    };
}

pub(crate) use impl_soft_delete;
