use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string_len(Users::Username, 150).unique_key())
                    .col(string_len(Users::Email, 254).unique_key())
                    .col(string(Users::PasswordHash))
                    .col(string_len(Users::FirstName, 150).default(""))
                    .col(string_len(Users::LastName, 150).default(""))
                    .col(string_len(Users::DefaultCurrency, 3).default("ARS"))
                    .col(integer(Users::AlertThreshold).default(80))
                    .col(boolean(Users::IsActive).default(true))
                    .col(boolean(Users::IsStaff).default(false))
                    .col(boolean(Users::IsSuperuser).default(false))
                    .col(timestamp_with_time_zone_null(Users::LastLogin))
                    .col(timestamp_with_time_zone(Users::CreatedAt))
                    .col(timestamp_with_time_zone(Users::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // Categories; system rows have no owner
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(pk_auto(Categories::Id))
                    .col(string_len(Categories::Name, 100))
                    .col(string_len(Categories::CategoryType, 10))
                    .col(integer_null(Categories::UserId))
                    .col(boolean(Categories::IsSystem).default(false))
                    .col(string_len(Categories::Icon, 50))
                    .col(string_len(Categories::Color, 7))
                    .col(boolean(Categories::IsActive).default(true))
                    .col(timestamp_with_time_zone_null(Categories::DeletedAt))
                    .col(timestamp_with_time_zone(Categories::CreatedAt))
                    .col(timestamp_with_time_zone(Categories::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_category_user")
                            .from(Categories::Table, Categories::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_categories_name_user_type")
                    .table(Categories::Table)
                    .col(Categories::Name)
                    .col(Categories::UserId)
                    .col(Categories::CategoryType)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Savings::Table)
                    .if_not_exists()
                    .col(pk_auto(Savings::Id))
                    .col(integer(Savings::UserId))
                    .col(string_len(Savings::Name, 100))
                    .col(text(Savings::Description).default(""))
                    .col(decimal(Savings::TargetAmount).decimal_len(12, 2))
                    .col(decimal(Savings::CurrentAmount).decimal_len(12, 2).default(0))
                    .col(string_len(Savings::Currency, 3).default("ARS"))
                    .col(date_null(Savings::TargetDate))
                    .col(string_len(Savings::Status, 10).default("ACTIVE"))
                    .col(string_len(Savings::Icon, 50))
                    .col(string_len(Savings::Color, 7))
                    .col(boolean(Savings::IsActive).default(true))
                    .col(timestamp_with_time_zone_null(Savings::DeletedAt))
                    .col(timestamp_with_time_zone(Savings::CreatedAt))
                    .col(timestamp_with_time_zone(Savings::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_saving_user")
                            .from(Savings::Table, Savings::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_savings_user_status")
                    .table(Savings::Table)
                    .col(Savings::UserId)
                    .col(Savings::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(pk_auto(Expenses::Id))
                    .col(integer(Expenses::UserId))
                    .col(integer(Expenses::CategoryId))
                    .col(integer_null(Expenses::SavingId))
                    .col(date(Expenses::Date))
                    .col(string_len(Expenses::Description, 255))
                    .col(decimal(Expenses::Amount).decimal_len(12, 2))
                    .col(string_len(Expenses::Currency, 3).default("ARS"))
                    .col(decimal(Expenses::ExchangeRate).decimal_len(10, 4).default(1))
                    .col(decimal(Expenses::AmountArs).decimal_len(14, 2))
                    .col(string_len_null(Expenses::PaymentMethod, 10))
                    .col(string_len_null(Expenses::ExpenseType, 10))
                    .col(boolean(Expenses::IsActive).default(true))
                    .col(timestamp_with_time_zone_null(Expenses::DeletedAt))
                    .col(timestamp_with_time_zone(Expenses::CreatedAt))
                    .col(timestamp_with_time_zone(Expenses::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expense_user")
                            .from(Expenses::Table, Expenses::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expense_category")
                            .from(Expenses::Table, Expenses::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expense_saving")
                            .from(Expenses::Table, Expenses::SavingId)
                            .to(Savings::Table, Savings::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_expenses_user_date")
                    .table(Expenses::Table)
                    .col(Expenses::UserId)
                    .col(Expenses::Date)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_expenses_user_category")
                    .table(Expenses::Table)
                    .col(Expenses::UserId)
                    .col(Expenses::CategoryId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Incomes::Table)
                    .if_not_exists()
                    .col(pk_auto(Incomes::Id))
                    .col(integer(Incomes::UserId))
                    .col(integer(Incomes::CategoryId))
                    .col(date(Incomes::Date))
                    .col(string_len(Incomes::Description, 255))
                    .col(decimal(Incomes::Amount).decimal_len(12, 2))
                    .col(string_len(Incomes::Currency, 3).default("ARS"))
                    .col(decimal(Incomes::ExchangeRate).decimal_len(10, 4).default(1))
                    .col(decimal(Incomes::AmountArs).decimal_len(14, 2))
                    .col(boolean(Incomes::IsRecurring).default(false))
                    .col(boolean(Incomes::IsActive).default(true))
                    .col(timestamp_with_time_zone_null(Incomes::DeletedAt))
                    .col(timestamp_with_time_zone(Incomes::CreatedAt))
                    .col(timestamp_with_time_zone(Incomes::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_income_user")
                            .from(Incomes::Table, Incomes::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_income_category")
                            .from(Incomes::Table, Incomes::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_incomes_user_date")
                    .table(Incomes::Table)
                    .col(Incomes::UserId)
                    .col(Incomes::Date)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Budgets::Table)
                    .if_not_exists()
                    .col(pk_auto(Budgets::Id))
                    .col(integer(Budgets::UserId))
                    .col(integer(Budgets::CategoryId))
                    .col(integer(Budgets::Month))
                    .col(integer(Budgets::Year))
                    .col(decimal(Budgets::Amount).decimal_len(12, 2))
                    .col(integer(Budgets::AlertThreshold).default(80))
                    .col(text(Budgets::Notes).default(""))
                    .col(boolean(Budgets::IsActive).default(true))
                    .col(timestamp_with_time_zone_null(Budgets::DeletedAt))
                    .col(timestamp_with_time_zone(Budgets::CreatedAt))
                    .col(timestamp_with_time_zone(Budgets::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_budget_user")
                            .from(Budgets::Table, Budgets::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_budget_category")
                            .from(Budgets::Table, Budgets::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One budget row per period, soft-deleted rows included
        manager
            .create_index(
                Index::create()
                    .name("uq_budgets_user_category_period")
                    .table(Budgets::Table)
                    .col(Budgets::UserId)
                    .col(Budgets::CategoryId)
                    .col(Budgets::Month)
                    .col(Budgets::Year)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SavingMovements::Table)
                    .if_not_exists()
                    .col(pk_auto(SavingMovements::Id))
                    .col(integer(SavingMovements::SavingId))
                    .col(integer_null(SavingMovements::ExpenseId))
                    .col(string_len(SavingMovements::MovementType, 10))
                    .col(decimal(SavingMovements::Amount).decimal_len(12, 2))
                    .col(string_len(SavingMovements::Description, 255).default(""))
                    .col(date(SavingMovements::Date))
                    .col(timestamp_with_time_zone(SavingMovements::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_saving_movement_saving")
                            .from(SavingMovements::Table, SavingMovements::SavingId)
                            .to(Savings::Table, Savings::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_saving_movement_expense")
                            .from(SavingMovements::Table, SavingMovements::ExpenseId)
                            .to(Expenses::Table, Expenses::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_saving_movements_saving_date")
                    .table(SavingMovements::Table)
                    .col(SavingMovements::SavingId)
                    .col(SavingMovements::Date)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AccessAttempts::Table)
                    .if_not_exists()
                    .col(pk_auto(AccessAttempts::Id))
                    .col(string_len(AccessAttempts::Username, 254))
                    .col(string_len(AccessAttempts::IpAddress, 45))
                    .col(integer(AccessAttempts::Failures).default(0))
                    .col(timestamp_with_time_zone(AccessAttempts::LastFailureAt))
                    .col(timestamp_with_time_zone(AccessAttempts::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_access_attempts_username_ip")
                    .table(AccessAttempts::Table)
                    .col(AccessAttempts::Username)
                    .col(AccessAttempts::IpAddress)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop tables in reverse order to avoid foreign key constraints
        manager
            .drop_table(Table::drop().table(AccessAttempts::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(SavingMovements::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Budgets::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Incomes::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Savings::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Email,
    PasswordHash,
    FirstName,
    LastName,
    DefaultCurrency,
    AlertThreshold,
    IsActive,
    IsStaff,
    IsSuperuser,
    LastLogin,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
    Name,
    CategoryType,
    UserId,
    IsSystem,
    Icon,
    Color,
    IsActive,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Savings {
    Table,
    Id,
    UserId,
    Name,
    Description,
    TargetAmount,
    CurrentAmount,
    Currency,
    TargetDate,
    Status,
    Icon,
    Color,
    IsActive,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Expenses {
    Table,
    Id,
    UserId,
    CategoryId,
    SavingId,
    Date,
    Description,
    Amount,
    Currency,
    ExchangeRate,
    AmountArs,
    PaymentMethod,
    ExpenseType,
    IsActive,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Incomes {
    Table,
    Id,
    UserId,
    CategoryId,
    Date,
    Description,
    Amount,
    Currency,
    ExchangeRate,
    AmountArs,
    IsRecurring,
    IsActive,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Budgets {
    Table,
    Id,
    UserId,
    CategoryId,
    Month,
    Year,
    Amount,
    AlertThreshold,
    Notes,
    IsActive,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SavingMovements {
    Table,
    Id,
    SavingId,
    ExpenseId,
    MovementType,
    Amount,
    Description,
    Date,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AccessAttempts {
    Table,
    Id,
    Username,
    IpAddress,
    Failures,
    LastFailureAt,
    CreatedAt,
}
