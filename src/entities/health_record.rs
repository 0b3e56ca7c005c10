//! Health record entity - vet visits, vaccinations, checkups and procedures.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Health record database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "health_records")]
pub struct Model {
    /// Unique identifier for the record
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning household
    pub household_id: i64,
    /// Pet the record is for
    pub pet_id: i64,
    /// One of the [`crate::models::HealthRecordType`] strings
    pub record_type: String,
    /// When the visit or treatment happened
    pub date: DateTimeUtc,
    /// Reason for the visit
    pub reason: Option<String>,
    /// Vaccine name (vaccinations only)
    pub vaccine_name: Option<String>,
    /// Clinic or vet name
    pub vet_name: Option<String>,
    /// Billed cost; positive costs count towards finance totals
    pub cost: Option<f64>,
    /// Next due date (vaccinations only)
    pub next_due_date: Option<DateTimeUtc>,
    /// Free-form notes
    pub notes: Option<String>,
    /// When the row was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `HealthRecord` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each record belongs to one household
    #[sea_orm(
        belongs_to = "super::household::Entity",
        from = "Column::HouseholdId",
        to = "super::household::Column::Id",
        on_delete = "Cascade"
    )]
    Household,
    /// Each record is for one pet
    #[sea_orm(
        belongs_to = "super::pet::Entity",
        from = "Column::PetId",
        to = "super::pet::Column::Id",
        on_delete = "Cascade"
    )]
    Pet,
}

impl ActiveModelBehavior for ActiveModel {}
