//! Connection repository for database operations
//!
//! Encapsulates SeaORM operations for the connections table. The central
//! invariant is one row per `(slack_user_id, team_id)`: reconnecting any
//! service patches fields on the existing row instead of inserting a
//! duplicate.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::connection::{self, Entity as Connection};

/// Partial update applied when a user connects or reconnects a service.
///
/// `None` fields are left untouched on the existing row, so a GitHub token
/// entry does not clobber previously stored Google tokens and vice versa.
#[derive(Debug, Clone, Default)]
pub struct ConnectionPatch {
    pub slack_user_name: Option<String>,
    pub google_access_token: Option<String>,
    pub google_refresh_token: Option<String>,
    pub google_id_token: Option<String>,
    pub google_email: Option<String>,
    pub google_token_expiry: Option<DateTime<Utc>>,
    pub github_token: Option<String>,
    pub github_owner: Option<String>,
    pub github_repo: Option<String>,
}

/// Repository for connection database operations
#[derive(Debug, Clone)]
pub struct ConnectionRepository {
    pub db: Arc<DatabaseConnection>,
}

impl ConnectionRepository {
    /// Creates a new ConnectionRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds the connection row for a user within a team.
    pub async fn find_by_user(
        &self,
        slack_user_id: &str,
        team_id: Option<&str>,
    ) -> Result<Option<connection::Model>> {
        let mut query =
            Connection::find().filter(connection::Column::SlackUserId.eq(slack_user_id));

        query = match team_id {
            Some(team) => query.filter(connection::Column::TeamId.eq(team)),
            None => query.filter(connection::Column::TeamId.is_null()),
        };

        Ok(query.one(&*self.db).await?)
    }

    /// Lists all connections for a team ordered by creation time then ID.
    pub async fn find_by_team(&self, team_id: &str) -> Result<Vec<connection::Model>> {
        Ok(Connection::find()
            .filter(connection::Column::TeamId.eq(team_id))
            .order_by_asc(connection::Column::CreatedAt)
            .order_by_asc(connection::Column::Id)
            .all(&*self.db)
            .await?)
    }

    /// Upserts a connection for `(slack_user_id, team_id)`.
    ///
    /// Creates the row on a user's first connect; subsequent connects for
    /// any service update only the fields present in the patch.
    pub async fn upsert(
        &self,
        slack_user_id: &str,
        team_id: Option<&str>,
        patch: ConnectionPatch,
    ) -> Result<connection::Model> {
        let now: DateTimeWithTimeZone = Utc::now().into();

        if let Some(existing) = self.find_by_user(slack_user_id, team_id).await? {
            let mut model: connection::ActiveModel = existing.into();
            apply_patch(&mut model, patch);
            model.updated_at = Set(now);
            return Ok(model.update(&*self.db).await?);
        }

        let id = Uuid::new_v4();
        let mut model = connection::ActiveModel {
            id: Set(id),
            slack_user_id: Set(slack_user_id.to_string()),
            team_id: Set(team_id.map(|t| t.to_string())),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        apply_patch(&mut model, patch);
        model.insert(&*self.db).await?;

        // Query the record directly so SQLite returns the persisted row too
        let fetched = Connection::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("connection not persisted"))
    }
}

fn apply_patch(model: &mut connection::ActiveModel, patch: ConnectionPatch) {
    if let Some(name) = patch.slack_user_name {
        model.slack_user_name = Set(Some(name));
    }
    if let Some(token) = patch.google_access_token {
        model.google_access_token = Set(Some(token));
    }
    if let Some(token) = patch.google_refresh_token {
        model.google_refresh_token = Set(Some(token));
    }
    if let Some(token) = patch.google_id_token {
        model.google_id_token = Set(Some(token));
    }
    if let Some(email) = patch.google_email {
        model.google_email = Set(Some(email));
    }
    if let Some(expiry) = patch.google_token_expiry {
        let fixed: DateTimeWithTimeZone = expiry.into();
        model.google_token_expiry = Set(Some(fixed));
    }
    if let Some(token) = patch.github_token {
        model.github_token = Set(Some(token));
    }
    if let Some(owner) = patch.github_owner {
        model.github_owner = Set(Some(owner));
    }
    if let Some(repo) = patch.github_repo {
        model.github_repo = Set(Some(repo));
    }
}
