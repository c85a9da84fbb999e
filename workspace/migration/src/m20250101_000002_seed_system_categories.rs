use model::entities::category;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        category::seed_system_categories(manager.get_connection())
            .await
            .map_err(|e| DbErr::Migration(format!("Seeding system categories failed: {}", e)))?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let delete = Query::delete()
            .from_table(Alias::new("categories"))
            .and_where(Expr::col(Alias::new("is_system")).eq(true))
            .to_owned();
        manager.exec_stmt(delete).await?;
        Ok(())
    }
}
