//! Connection entity model
//!
//! SeaORM entity for the connections table, which stores one user's linked
//! external accounts for one Slack team. At most one row exists per
//! `(slack_user_id, team_id)`; reconnecting a service upserts fields on the
//! existing row.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Connection entity representing a user's linked external accounts
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "connections")]
pub struct Model {
    /// Unique identifier for the connection (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Slack user identifier this connection belongs to
    pub slack_user_id: String,

    /// Slack team identifier (nullable for legacy rows)
    pub team_id: Option<String>,

    /// Display name captured from the Slack profile (optional)
    pub slack_user_name: Option<String>,

    /// Google OAuth access token
    pub google_access_token: Option<String>,

    /// Google OAuth refresh token
    pub google_refresh_token: Option<String>,

    /// Google OpenID Connect identity token (carries the account email claim)
    pub google_id_token: Option<String>,

    /// Google account email resolved at connect time
    pub google_email: Option<String>,

    /// Google access token expiry
    pub google_token_expiry: Option<DateTimeWithTimeZone>,

    /// GitHub personal access token
    pub github_token: Option<String>,

    /// Legacy single-repo scoping: repository owner
    pub github_owner: Option<String>,

    /// Legacy single-repo scoping: repository name
    pub github_repo: Option<String>,

    /// Timestamp when the connection was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the connection was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
