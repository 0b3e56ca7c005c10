//! Household entity - the tenant boundary.
//!
//! Every other row in the database belongs to exactly one household. Deleting a
//! household cascades to its members, pets and all pet records.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Household database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "households")]
pub struct Model {
    /// Unique identifier for the household
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "The Smiths")
    pub name: String,
    /// Theme primary colour as a hex string
    pub primary_color: Option<String>,
    /// Theme secondary colour as a hex string
    pub secondary_color: Option<String>,
    /// Public URL of the household avatar
    pub avatar_url: Option<String>,
    /// Short shareable code used to request access
    #[sea_orm(unique)]
    pub join_code: String,
    /// Identity-provider user id of the creator
    pub created_by: String,
    /// When the household was created
    pub created_at: DateTimeUtc,
    /// When the household was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Household and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One household has many members
    #[sea_orm(has_many = "super::member::Entity")]
    Members,
    /// One household has many pets
    #[sea_orm(has_many = "super::pet::Entity")]
    Pets,
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::pet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
