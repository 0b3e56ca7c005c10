//! Feeding schedule entity - a recurring daily feeding slot for a pet.
//!
//! Schedules have no per-day rows; a day counts as done when a
//! [`super::feeding_log`] row exists for (schedule, date).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Feeding schedule database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "feeding_schedules")]
pub struct Model {
    /// Unique identifier for the schedule
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning household
    pub household_id: i64,
    /// Pet being fed
    pub pet_id: i64,
    /// Slot label (e.g., "Breakfast")
    pub label: String,
    /// Time of day as `HH:MM`
    pub time_of_day: String,
    /// Food to serve
    pub food_type: Option<String>,
    /// Portion description
    pub amount: Option<String>,
    /// Inactive schedules are kept for history but not materialised
    pub is_active: bool,
    /// When the schedule was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `FeedingSchedule` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each schedule belongs to one household
    #[sea_orm(
        belongs_to = "super::household::Entity",
        from = "Column::HouseholdId",
        to = "super::household::Column::Id",
        on_delete = "Cascade"
    )]
    Household,
    /// Each schedule is for one pet
    #[sea_orm(
        belongs_to = "super::pet::Entity",
        from = "Column::PetId",
        to = "super::pet::Column::Id",
        on_delete = "Cascade"
    )]
    Pet,
    /// One schedule has many completion logs
    #[sea_orm(has_many = "super::feeding_log::Entity")]
    Logs,
}

impl Related<super::feeding_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Logs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
