//! Recap repository for database operations
//!
//! Encapsulates SeaORM operations for the daily_recaps table. The contract
//! here is the central one of the whole service: at most one authoritative
//! recap per `(user_id, team_id, UTC day)`, with the day lifecycle modelled
//! as an explicit transition argument rather than inferred from the caller.

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::is_unique_violation;
use crate::models::daily_recap::{self, Entity as DailyRecap};

/// Day lifecycle of a recap derived from row presence and the AI flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecapStatus {
    /// No row exists for the day
    Empty,
    /// A machine draft exists and has not been confirmed
    Drafted,
    /// The user has submitted or edited the recap
    Confirmed,
}

/// The write being applied, passed explicitly by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecapTransition {
    /// An AI-generated draft. Preserves `notes`, never overwrites a
    /// Confirmed recap.
    AiDraft,
    /// A user submission. Always wins, updates every field.
    UserSubmit,
}

/// Content fields for a recap write.
#[derive(Debug, Clone, Default)]
pub struct RecapFields {
    pub progress: String,
    pub blockers: String,
    pub plan: String,
    pub notes: Option<String>,
}

/// Returns the UTC calendar day a timestamp belongs to.
pub fn day_of(ts: DateTime<Utc>) -> NaiveDate {
    ts.date_naive()
}

/// Repository for daily recap database operations
#[derive(Debug, Clone)]
pub struct RecapRepository {
    pub db: Arc<DatabaseConnection>,
}

impl RecapRepository {
    /// Creates a new RecapRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds the recap row for a user/team/day, if any.
    pub async fn find_for_day(
        &self,
        user_id: &str,
        team_id: &str,
        day: NaiveDate,
    ) -> Result<Option<daily_recap::Model>> {
        Ok(DailyRecap::find()
            .filter(daily_recap::Column::UserId.eq(user_id))
            .filter(daily_recap::Column::TeamId.eq(team_id))
            .filter(daily_recap::Column::Day.eq(day))
            .one(&*self.db)
            .await?)
    }

    /// Returns the day lifecycle status for a user/team/day.
    pub async fn status_for_day(
        &self,
        user_id: &str,
        team_id: &str,
        day: NaiveDate,
    ) -> Result<RecapStatus> {
        Ok(match self.find_for_day(user_id, team_id, day).await? {
            None => RecapStatus::Empty,
            Some(row) if row.is_ai_generated => RecapStatus::Drafted,
            Some(_) => RecapStatus::Confirmed,
        })
    }

    /// True when any recap row (draft or confirmed) exists for today, UTC.
    pub async fn has_recap_today(&self, user_id: &str, team_id: &str) -> Result<bool> {
        let today = day_of(Utc::now());
        Ok(self.find_for_day(user_id, team_id, today).await?.is_some())
    }

    /// Lists a team's recaps for one day ordered by user, for the
    /// completion-status report.
    pub async fn list_team_for_day(
        &self,
        team_id: &str,
        day: NaiveDate,
    ) -> Result<Vec<daily_recap::Model>> {
        Ok(DailyRecap::find()
            .filter(daily_recap::Column::TeamId.eq(team_id))
            .filter(daily_recap::Column::Day.eq(day))
            .order_by_asc(daily_recap::Column::UserId)
            .all(&*self.db)
            .await?)
    }

    /// Finds a recap by its primary key.
    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<daily_recap::Model>> {
        Ok(DailyRecap::find_by_id(*id).one(&*self.db).await?)
    }

    /// Upserts the recap for `(user_id, team_id, day)` and returns its ID.
    ///
    /// Rules:
    /// - `AiDraft` onto a Confirmed row is ignored; the existing row wins
    ///   and its ID is returned unchanged.
    /// - `AiDraft` onto a Drafted row replaces progress/blockers/plan and
    ///   leaves `notes` untouched.
    /// - `UserSubmit` replaces every field and clears the AI flag.
    /// - A lost insert race is retried once as an update.
    pub async fn upsert(
        &self,
        user_id: &str,
        team_id: &str,
        day: NaiveDate,
        fields: RecapFields,
        transition: RecapTransition,
    ) -> Result<Uuid> {
        if let Some(existing) = self.find_for_day(user_id, team_id, day).await? {
            return self.apply_to_existing(existing, fields, transition).await;
        }

        let now: DateTimeWithTimeZone = Utc::now().into();
        let id = Uuid::new_v4();
        let model = daily_recap::ActiveModel {
            id: Set(id),
            user_id: Set(user_id.to_string()),
            team_id: Set(team_id.to_string()),
            day: Set(day),
            submitted_at: Set(now),
            progress: Set(fields.progress.clone()),
            blockers: Set(fields.blockers.clone()),
            plan: Set(fields.plan.clone()),
            notes: Set(fields.notes.clone()),
            is_ai_generated: Set(matches!(transition, RecapTransition::AiDraft)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match model.insert(&*self.db).await {
            Ok(_) => Ok(id),
            Err(err) if is_unique_violation(&err) => {
                // Concurrent writer inserted the day row first; apply ours
                // as an update on top of it.
                warn!(
                    user_id,
                    team_id,
                    %day,
                    "recap insert lost a race, retrying as update"
                );
                let existing = self
                    .find_for_day(user_id, team_id, day)
                    .await?
                    .ok_or_else(|| anyhow!("recap row vanished after unique violation"))?;
                self.apply_to_existing(existing, fields, transition).await
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn apply_to_existing(
        &self,
        existing: daily_recap::Model,
        fields: RecapFields,
        transition: RecapTransition,
    ) -> Result<Uuid> {
        let id = existing.id;

        // Once confirmed, the day is terminal for AI writes.
        if matches!(transition, RecapTransition::AiDraft) && !existing.is_ai_generated {
            info!(
                user_id = %existing.user_id,
                team_id = %existing.team_id,
                day = %existing.day,
                "ignoring AI draft over a user-confirmed recap"
            );
            return Ok(id);
        }

        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut model: daily_recap::ActiveModel = existing.into();
        model.progress = Set(fields.progress);
        model.blockers = Set(fields.blockers);
        model.plan = Set(fields.plan);
        model.submitted_at = Set(now);
        model.updated_at = Set(now);

        match transition {
            RecapTransition::AiDraft => {
                model.is_ai_generated = Set(true);
                // notes stay as they are
            }
            RecapTransition::UserSubmit => {
                model.is_ai_generated = Set(false);
                model.notes = Set(fields.notes);
            }
        }

        model.update(&*self.db).await?;
        Ok(id)
    }
}
