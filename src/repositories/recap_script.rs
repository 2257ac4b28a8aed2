//! Recap script repository for database operations
//!
//! Upsert-on-conflict by `recap_id`: regenerating a script replaces the
//! previous one for the same recap.

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::recap_script::{self, Entity as RecapScript};

/// Repository for recap script database operations
#[derive(Debug, Clone)]
pub struct RecapScriptRepository {
    pub db: Arc<DatabaseConnection>,
}

impl RecapScriptRepository {
    /// Creates a new RecapScriptRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds the script generated for a recap, if any.
    pub async fn find_by_recap(&self, recap_id: &Uuid) -> Result<Option<recap_script::Model>> {
        Ok(RecapScript::find()
            .filter(recap_script::Column::RecapId.eq(*recap_id))
            .one(&*self.db)
            .await?)
    }

    /// Upserts the script for a recap and returns the persisted row.
    pub async fn upsert_for_recap(
        &self,
        recap_id: &Uuid,
        script: String,
    ) -> Result<recap_script::Model> {
        let now: DateTimeWithTimeZone = Utc::now().into();

        if let Some(existing) = self.find_by_recap(recap_id).await? {
            let mut model: recap_script::ActiveModel = existing.into();
            model.script = Set(script);
            model.updated_at = Set(now);
            return Ok(model.update(&*self.db).await?);
        }

        let id = Uuid::new_v4();
        let model = recap_script::ActiveModel {
            id: Set(id),
            recap_id: Set(*recap_id),
            script: Set(script),
            created_at: Set(now),
            updated_at: Set(now),
        };
        model.insert(&*self.db).await?;

        let fetched = RecapScript::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("recap script not persisted"))
    }
}
