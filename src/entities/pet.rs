//! Pet entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Pet database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pets")]
pub struct Model {
    /// Unique identifier for the pet
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning household
    pub household_id: i64,
    /// Pet name
    pub name: String,
    /// Species (e.g., "dog", "cat")
    pub species: String,
    /// Breed, if known
    pub breed: Option<String>,
    /// Sex, if known
    pub sex: Option<String>,
    /// Date of birth, stored as midnight UTC
    pub date_of_birth: Option<DateTimeUtc>,
    /// Latest weight in kilograms
    pub weight_kg: Option<f64>,
    /// Microchip or registration identifier
    pub microchip_id: Option<String>,
    /// Free-form notes
    pub notes: Option<String>,
    /// Public URL of the avatar image
    pub avatar_url: Option<String>,
    /// When the pet was created
    pub created_at: DateTimeUtc,
    /// When the pet was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Pet and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each pet belongs to one household
    #[sea_orm(
        belongs_to = "super::household::Entity",
        from = "Column::HouseholdId",
        to = "super::household::Column::Id",
        on_delete = "Cascade"
    )]
    Household,
}

impl Related<super::household::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Household.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
