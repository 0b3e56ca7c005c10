//! Medication entity - a named course of treatment.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Medication database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "medications")]
pub struct Model {
    /// Unique identifier for the medication
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning household
    pub household_id: i64,
    /// Pet receiving the medication
    pub pet_id: i64,
    /// Medication name
    pub name: String,
    /// Dosage (e.g., "5mg")
    pub dosage: Option<String>,
    /// Frequency (e.g., "twice daily")
    pub frequency: Option<String>,
    /// First day of the course
    pub start_date: Option<Date>,
    /// Last day of the course
    pub end_date: Option<Date>,
    /// Whether the course is ongoing
    pub is_active: bool,
    /// Free-form notes
    pub notes: Option<String>,
    /// When the row was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Medication and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each medication belongs to one household
    #[sea_orm(
        belongs_to = "super::household::Entity",
        from = "Column::HouseholdId",
        to = "super::household::Column::Id",
        on_delete = "Cascade"
    )]
    Household,
    /// Each medication is for one pet
    #[sea_orm(
        belongs_to = "super::pet::Entity",
        from = "Column::PetId",
        to = "super::pet::Column::Id",
        on_delete = "Cascade"
    )]
    Pet,
}

impl ActiveModelBehavior for ActiveModel {}
