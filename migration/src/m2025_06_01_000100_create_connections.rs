//! Migration to create the connections table.
//!
//! A connection stores one user's linked external accounts for one Slack
//! team: Google OAuth tokens, a GitHub personal access token, and optional
//! legacy repo scoping. At most one row exists per (slack_user_id, team_id).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Connections::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Connections::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Connections::SlackUserId).text().not_null())
                    .col(ColumnDef::new(Connections::TeamId).text().null())
                    .col(ColumnDef::new(Connections::SlackUserName).text().null())
                    .col(ColumnDef::new(Connections::GoogleAccessToken).text().null())
                    .col(
                        ColumnDef::new(Connections::GoogleRefreshToken)
                            .text()
                            .null(),
                    )
                    .col(ColumnDef::new(Connections::GoogleIdToken).text().null())
                    .col(ColumnDef::new(Connections::GoogleEmail).text().null())
                    .col(
                        ColumnDef::new(Connections::GoogleTokenExpiry)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Connections::GithubToken).text().null())
                    .col(ColumnDef::new(Connections::GithubOwner).text().null())
                    .col(ColumnDef::new(Connections::GithubRepo).text().null())
                    .col(
                        ColumnDef::new(Connections::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Connections::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // One row per user per team; reconnects upsert into this row.
        manager
            .create_index(
                Index::create()
                    .name("idx_connections_user_team")
                    .table(Connections::Table)
                    .col(Connections::SlackUserId)
                    .col(Connections::TeamId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_connections_team_id")
                    .table(Connections::Table)
                    .col(Connections::TeamId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_connections_user_team").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_connections_team_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Connections::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Connections {
    Table,
    Id,
    SlackUserId,
    TeamId,
    SlackUserName,
    GoogleAccessToken,
    GoogleRefreshToken,
    GoogleIdToken,
    GoogleEmail,
    GoogleTokenExpiry,
    GithubToken,
    GithubOwner,
    GithubRepo,
    CreatedAt,
    UpdatedAt,
}
