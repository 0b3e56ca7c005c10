//! Invitation entity - a token-bearing offer to join a household with a preset role.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Invitation database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invitations")]
pub struct Model {
    /// Unique identifier for the invitation
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Household the invitee would join
    pub household_id: i64,
    /// Optional e-mail the invitation was addressed to
    pub email: Option<String>,
    /// Role granted on acceptance
    pub role: String,
    /// Opaque token shared with the invitee
    #[sea_orm(unique)]
    pub token: String,
    /// One of the [`crate::models::InvitationStatus`] strings
    pub status: String,
    /// User id of the admin who issued the invitation
    pub invited_by: String,
    /// After this instant the invitation can no longer be accepted
    pub expires_at: DateTimeUtc,
    /// When the invitation was created
    pub created_at: DateTimeUtc,
    /// When the invitee accepted or declined
    pub responded_at: Option<DateTimeUtc>,
}

/// Defines relationships between Invitation and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each invitation belongs to one household
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
