//! Recap script entity model
//!
//! SeaORM entity for the recap_scripts table: one generated first-person
//! spoken script per recap, keyed 1:1 by `recap_id`.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "recap_scripts")]
pub struct Model {
    /// Unique identifier for the script (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Recap this script was generated from (unique)
    pub recap_id: Uuid,

    /// First-person spoken script text
    pub script: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::daily_recap::Entity",
        from = "Column::RecapId",
        to = "super::daily_recap::Column::Id"
    )]
    DailyRecap,
}

impl Related<super::daily_recap::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DailyRecap.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
