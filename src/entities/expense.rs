//! Expense entity - a categorised cost tied to a pet.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Expense database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    /// Unique identifier for the expense
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning household
    pub household_id: i64,
    /// Pet the expense is for
    pub pet_id: i64,
    /// One of the [`crate::models::ExpenseCategory`] strings
    pub category: String,
    /// Amount in the household currency, always positive
    pub amount: f64,
    /// Optional description
    pub description: Option<String>,
    /// When the expense was incurred
    pub date: DateTimeUtc,
    /// Member who recorded it
    pub member_id: Option<i64>,
    /// When the row was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Expense and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each expense belongs to one household
    #[sea_orm(
        belongs_to = "super::household::Entity",
        from = "Column::HouseholdId",
        to = "super::household::Column::Id",
        on_delete = "Cascade"
    )]
    Household,
    /// Each expense is for one pet
    #[sea_orm(
        belongs_to = "super::pet::Entity",
        from = "Column::PetId",
        to = "super::pet::Column::Id",
        on_delete = "Cascade"
    )]
    Pet,
}

impl ActiveModelBehavior for ActiveModel {}
