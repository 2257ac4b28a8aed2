//! Daily recap entity model
//!
//! SeaORM entity for the daily_recaps table. One authoritative row exists
//! per `(user_id, team_id, day)`, where `day` is the UTC calendar date of
//! `submitted_at`. The `is_ai_generated` flag distinguishes a machine draft
//! from a human-edited entry; the derived lifecycle status lives in the
//! repository layer.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "daily_recaps")]
pub struct Model {
    /// Unique identifier for the recap (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Slack user identifier the recap belongs to
    pub user_id: String,

    /// Slack team identifier
    pub team_id: String,

    /// UTC calendar day derived from `submitted_at` at write time
    pub day: Date,

    /// Timestamp of the most recent write (draft or submission)
    pub submitted_at: DateTimeWithTimeZone,

    /// What the user worked on (bullet-point text by UI convention)
    pub progress: String,

    /// What is blocking the user
    pub blockers: String,

    /// What the user plans to do next
    pub plan: String,

    /// Free-text notes, user-authored only; never touched by AI drafts
    pub notes: Option<String>,

    /// True while the row is a machine draft; a user submission clears it
    pub is_ai_generated: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::recap_script::Entity")]
    RecapScript,
}

impl Related<super::recap_script::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecapScript.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
