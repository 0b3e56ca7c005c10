//! Member entity - binds an external identity to a household with a role.
//!
//! The `role` column holds one of the [`crate::models::Role`] strings. A
//! unique index on (`household_id`, `user_id`) is created alongside the table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Member database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "members")]
pub struct Model {
    /// Unique identifier for the membership
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Household this membership belongs to
    pub household_id: i64,
    /// Identity-provider subject
    pub user_id: String,
    /// `"owner"`, `"admin"`, `"member"` or `"sitter"`
    pub role: String,
    /// Name shown to other household members
    pub display_name: String,
    /// When the user joined
    pub joined_at: DateTimeUtc,
}

/// Defines relationships between Member and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each member belongs to one household
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
