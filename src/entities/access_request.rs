//! Access request entity - a user asking to join via a household's join code.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Access request database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "access_requests")]
pub struct Model {
    /// Unique identifier for the request
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Household the user wants to join
    pub household_id: i64,
    /// Requesting user
    pub user_id: String,
    /// Name the requester wants to be shown as
    pub display_name: String,
    /// Optional note for the admins
    pub message: Option<String>,
    /// One of the [`crate::models::AccessRequestStatus`] strings
    pub status: String,
    /// When the request was made
    pub created_at: DateTimeUtc,
    /// When an admin approved or denied it
    pub resolved_at: Option<DateTimeUtc>,
    /// User id of the admin who resolved it
    pub resolved_by: Option<String>,
}

/// Defines relationships between `AccessRequest` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each request targets one household
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
