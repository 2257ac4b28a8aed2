//! Migration to create the daily_recaps table.
//!
//! One authoritative recap per (user_id, team_id, UTC calendar day). The
//! `day` column is the UTC date derived from `submitted_at` at write time so
//! the uniqueness contract can be enforced by the store itself.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DailyRecaps::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DailyRecaps::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DailyRecaps::UserId).text().not_null())
                    .col(ColumnDef::new(DailyRecaps::TeamId).text().not_null())
                    .col(ColumnDef::new(DailyRecaps::Day).date().not_null())
                    .col(
                        ColumnDef::new(DailyRecaps::SubmittedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DailyRecaps::Progress)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(DailyRecaps::Blockers)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(DailyRecaps::Plan)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(DailyRecaps::Notes).text().null())
                    .col(
                        ColumnDef::new(DailyRecaps::IsAiGenerated)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(DailyRecaps::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(DailyRecaps::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // The central correctness contract: one recap per user/team/day.
        manager
            .create_index(
                Index::create()
                    .name("idx_daily_recaps_user_team_day")
                    .table(DailyRecaps::Table)
                    .col(DailyRecaps::UserId)
                    .col(DailyRecaps::TeamId)
                    .col(DailyRecaps::Day)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Dashboard report queries scan by team and day.
        manager
            .create_index(
                Index::create()
                    .name("idx_daily_recaps_team_day")
                    .table(DailyRecaps::Table)
                    .col(DailyRecaps::TeamId)
                    .col(DailyRecaps::Day)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_daily_recaps_user_team_day")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(Index::drop().name("idx_daily_recaps_team_day").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(DailyRecaps::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DailyRecaps {
    Table,
    Id,
    UserId,
    TeamId,
    Day,
    SubmittedAt,
    Progress,
    Blockers,
    Plan,
    Notes,
    IsAiGenerated,
    CreatedAt,
    UpdatedAt,
}
