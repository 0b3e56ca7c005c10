//! Feeding log entity - records that a schedule was fulfilled on a date.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Feeding log database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "feeding_logs")]
pub struct Model {
    /// Unique identifier for the log entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning household
    pub household_id: i64,
    /// Schedule that was fulfilled
    pub schedule_id: i64,
    /// Calendar date the feeding counts for
    pub date: Date,
    /// Member who fed the pet
    pub member_id: Option<i64>,
    /// When the feeding was recorded
    pub fed_at: DateTimeUtc,
    /// Free-form notes
    pub notes: Option<String>,
}

/// Defines relationships between `FeedingLog` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each log belongs to one schedule
    #[sea_orm(
        belongs_to = "super::feeding_schedule::Entity",
        from = "Column::ScheduleId",
        to = "super::feeding_schedule::Column::Id",
        on_delete = "Cascade"
    )]
    Schedule,
}

impl Related<super::feeding_schedule::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Schedule.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
