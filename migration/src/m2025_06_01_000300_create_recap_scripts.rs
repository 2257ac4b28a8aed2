//! Migration to create the recap_scripts table.
//!
//! A recap script is a derived artifact: one generated first-person spoken
//! script per recap, keyed 1:1 by recap_id with upsert-on-conflict.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RecapScripts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RecapScripts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RecapScripts::RecapId).uuid().not_null())
                    .col(ColumnDef::new(RecapScripts::Script).text().not_null())
                    .col(
                        ColumnDef::new(RecapScripts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(RecapScripts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_recap_scripts_recap_id")
                            .from(RecapScripts::Table, RecapScripts::RecapId)
                            .to(DailyRecaps::Table, DailyRecaps::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_recap_scripts_recap_id")
                    .table(RecapScripts::Table)
                    .col(RecapScripts::RecapId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_recap_scripts_recap_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(RecapScripts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum RecapScripts {
    Table,
    Id,
    RecapId,
    Script,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum DailyRecaps {
    Table,
    Id,
}
