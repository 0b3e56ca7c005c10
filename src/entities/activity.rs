//! Activity entity - a logged or scheduled task for a pet.
//!
//! An activity with `scheduled_at` set shows up on the calendar; `completed_at`
//! is set when somebody marks it done (or immediately for after-the-fact logs).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Activity database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activities")]
pub struct Model {
    /// Unique identifier for the activity
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning household
    pub household_id: i64,
    /// Pet the activity is for
    pub pet_id: i64,
    /// Member who logged the activity, if still a member
    pub member_id: Option<i64>,
    /// One of the [`crate::models::ActivityKind`] strings
    pub kind: String,
    /// Short title shown in lists and on the calendar
    pub title: String,
    /// Free-form notes
    pub notes: Option<String>,
    /// When the activity is planned
    pub scheduled_at: Option<DateTimeUtc>,
    /// When the activity was done
    pub completed_at: Option<DateTimeUtc>,
    /// When the row was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Activity and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each activity belongs to one household
    #[sea_orm(
        belongs_to = "super::household::Entity",
        from = "Column::HouseholdId",
        to = "super::household::Column::Id",
        on_delete = "Cascade"
    )]
    Household,
    /// Each activity is for one pet
    #[sea_orm(
        belongs_to = "super::pet::Entity",
        from = "Column::PetId",
        to = "super::pet::Column::Id",
        on_delete = "Cascade"
    )]
    Pet,
    /// The member who logged it
    #[sea_orm(
        belongs_to = "super::member::Entity",
        from = "Column::MemberId",
        to = "super::member::Column::Id",
        on_delete = "SetNull"
    )]
    Member,
}

impl Related<super::pet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
