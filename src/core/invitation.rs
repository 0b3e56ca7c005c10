//! Invitation business logic.
//!
//! Admins issue token-bearing invitations with a preset role. The invitee accepts or
//! declines by token. Invitations expire seven days after creation; an expired pending
//! invitation is marked `expired` the first time somebody tries to accept it.

use crate::{
    core::{
        membership::{Membership, find_member, insert_member},
        validation::optional_text,
    },
    entities::{Household, Invitation, invitation, member},
    errors::{Error, Result},
    models::{InvitationStatus, Role},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{DatabaseTransaction, QueryOrder, QuerySelect, Select, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// How long an invitation stays valid.
pub const INVITATION_TTL_DAYS: i64 = 7;

/// Input for [`create_invitation`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewInvitation {
    /// Who the invitation is for
    #[serde(default)]
    pub email: Option<String>,
    /// Role granted on acceptance; never `owner`
    pub role: Role,
}

/// What an invitee sees before accepting.
#[derive(Debug, Clone, Serialize)]
pub struct InvitationPreview {
    /// Household name
    pub household_name: String,
    /// Role that will be granted
    pub role: Role,
    /// Current status; pending invitations past their expiry report `expired`
    pub status: InvitationStatus,
    /// Expiry
    pub expires_at: DateTime<Utc>,
}

fn by_token(token: &str) -> Select<Invitation> {
    Invitation::find().filter(invitation::Column::Token.eq(token))
}

async fn find_by_token(db: &DatabaseConnection, token: &str) -> Result<invitation::Model> {
    by_token(token)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Invitation", token))
}

/// Loads an invitation for a status change, holding its row lock until `txn` ends.
/// A concurrent accept or decline waits here and then sees the committed status.
async fn lock_by_token(txn: &DatabaseTransaction, token: &str) -> Result<invitation::Model> {
    by_token(token)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| Error::not_found("Invitation", token))
}

fn effective_status(invitation: &invitation::Model, now: DateTime<Utc>) -> Result<InvitationStatus> {
    let status: InvitationStatus = invitation.status.parse()?;
    if status == InvitationStatus::Pending && invitation.expires_at <= now {
        return Ok(InvitationStatus::Expired);
    }
    Ok(status)
}

/// Issues an invitation. Requires admin.
#[instrument(skip(db, actor))]
pub async fn create_invitation(
    db: &DatabaseConnection,
    actor: &Membership,
    input: NewInvitation,
) -> Result<invitation::Model> {
    actor.require(Role::Admin)?;
    if input.role == Role::Owner {
        return Err(Error::bad_request("invitations cannot grant the owner role"));
    }
    let now = Utc::now();

    let invitation = invitation::ActiveModel {
        household_id: Set(actor.household_id),
        email: Set(optional_text(input.email)),
        role: Set(input.role.as_str().to_string()),
        token: Set(uuid::Uuid::new_v4().to_string()),
        status: Set(InvitationStatus::Pending.as_str().to_string()),
        invited_by: Set(actor.user_id().to_string()),
        expires_at: Set(now + Duration::days(INVITATION_TTL_DAYS)),
        created_at: Set(now),
        responded_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(invitation_id = invitation.id, role = %input.role, "Invitation created");
    Ok(invitation)
}

/// Lists pending invitations, newest first. Requires admin.
pub async fn list_pending(db: &DatabaseConnection, actor: &Membership) -> Result<Vec<invitation::Model>> {
    actor.require(Role::Admin)?;
    Invitation::find()
        .filter(invitation::Column::HouseholdId.eq(actor.household_id))
        .filter(invitation::Column::Status.eq(InvitationStatus::Pending.as_str()))
        .order_by_desc(invitation::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Withdraws a pending invitation. Requires admin.
#[instrument(skip(db, actor))]
pub async fn revoke_invitation(
    db: &DatabaseConnection,
    actor: &Membership,
    invitation_id: i64,
) -> Result<()> {
    actor.require(Role::Admin)?;
    let invitation = Invitation::find_by_id(invitation_id)
        .filter(invitation::Column::HouseholdId.eq(actor.household_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Invitation", invitation_id))?;
    if invitation.status != InvitationStatus::Pending.as_str() {
        return Err(Error::conflict(format!(
            "invitation is already {}",
            invitation.status
        )));
    }
    invitation.delete(db).await?;
    info!(invitation_id, "Invitation revoked");
    Ok(())
}

/// Public preview of an invitation.
pub async fn get_by_token(db: &DatabaseConnection, token: &str) -> Result<InvitationPreview> {
    let invitation = find_by_token(db, token).await?;
    let household = Household::find_by_id(invitation.household_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Household", invitation.household_id))?;

    Ok(InvitationPreview {
        household_name: household.name,
        role: invitation.role.parse()?,
        status: effective_status(&invitation, Utc::now())?,
        expires_at: invitation.expires_at,
    })
}

/// Accepts an invitation and joins the household with the invited role.
#[instrument(skip(db))]
pub async fn accept_invitation(
    db: &DatabaseConnection,
    user_id: &str,
    token: &str,
    display_name: Option<String>,
) -> Result<member::Model> {
    let txn = db.begin().await?;
    let invitation = lock_by_token(&txn, token).await?;
    let now = Utc::now();

    match effective_status(&invitation, now)? {
        InvitationStatus::Pending => {}
        InvitationStatus::Expired => {
            if invitation.status != InvitationStatus::Expired.as_str() {
                let mut model: invitation::ActiveModel = invitation.into();
                model.status = Set(InvitationStatus::Expired.as_str().to_string());
                model.update(&txn).await?;
                txn.commit().await?;
            }
            return Err(Error::bad_request("invitation has expired"));
        }
        other => return Err(Error::conflict(format!("invitation is already {other}"))),
    }

    if find_member(&txn, invitation.household_id, user_id).await?.is_some() {
        return Err(Error::conflict("already a member of this household"));
    }

    let role: Role = invitation.role.parse()?;
    let display_name = optional_text(display_name)
        .or_else(|| invitation.email.clone())
        .unwrap_or_else(|| "Member".to_string());
    let member = insert_member(&txn, invitation.household_id, user_id, role, display_name).await?;

    let mut model: invitation::ActiveModel = invitation.into();
    model.status = Set(InvitationStatus::Accepted.as_str().to_string());
    model.responded_at = Set(Some(now));
    model.update(&txn).await?;
    txn.commit().await?;

    info!(household_id = member.household_id, member_id = member.id, "Invitation accepted");
    Ok(member)
}

/// Declines a pending invitation.
#[instrument(skip(db))]
pub async fn decline_invitation(db: &DatabaseConnection, token: &str) -> Result<invitation::Model> {
    let txn = db.begin().await?;
    let invitation = lock_by_token(&txn, token).await?;
    if invitation.status != InvitationStatus::Pending.as_str() {
        return Err(Error::conflict(format!(
            "invitation is already {}",
            invitation.status
        )));
    }

    let mut model: invitation::ActiveModel = invitation.into();
    model.status = Set(InvitationStatus::Declined.as_str().to_string());
    model.responded_at = Set(Some(Utc::now()));
    let updated = model.update(&txn).await?;
    txn.commit().await?;
    info!(invitation_id = updated.id, "Invitation declined");
    Ok(updated)
}
