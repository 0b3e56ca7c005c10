//! Member business logic - listing, role changes and removal.
//!
//! Every household keeps at least one owner. Role changes and removals lock the
//! household's owner rows before checking them, inside the same transaction as the
//! write that could break the rule.

use crate::{
    core::{
        membership::{Membership, lock_owners},
        validation::required_text,
    },
    entities::{Member, member},
    errors::{Error, Result},
    models::Role,
};
use sea_orm::{DatabaseTransaction, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Lists the household's members, oldest first.
pub async fn list_members(db: &DatabaseConnection, actor: &Membership) -> Result<Vec<member::Model>> {
    Member::find()
        .filter(member::Column::HouseholdId.eq(actor.household_id))
        .order_by_asc(member::Column::JoinedAt)
        .order_by_asc(member::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn member_in_household(
    txn: &DatabaseTransaction,
    household_id: i64,
    member_id: i64,
) -> Result<member::Model> {
    Member::find_by_id(member_id)
        .filter(member::Column::HouseholdId.eq(household_id))
        .one(txn)
        .await?
        .ok_or_else(|| Error::not_found("Member", member_id))
}

fn ensure_not_last_owner(owners: &[member::Model], target: &member::Model) -> Result<()> {
    if target.role == Role::Owner.as_str() && owners.iter().all(|o| o.id == target.id) {
        return Err(Error::bad_request(
            "a household must keep at least one owner",
        ));
    }
    Ok(())
}

/// Changes a member's role.
///
/// Admins may move members between admin, member and sitter. Only owners may grant
/// the owner role or change another owner's role, and the last owner cannot be demoted.
#[instrument(skip(db, actor))]
pub async fn update_role(
    db: &DatabaseConnection,
    actor: &Membership,
    member_id: i64,
    role: Role,
) -> Result<member::Model> {
    actor.require(Role::Admin)?;

    let txn = db.begin().await?;
    let owners = lock_owners(&txn, actor.household_id).await?;
    let target = member_in_household(&txn, actor.household_id, member_id).await?;
    let current: Role = target.role.parse()?;

    if (role == Role::Owner || current == Role::Owner) && actor.role != Role::Owner {
        return Err(Error::forbidden("only owners can grant or revoke the owner role"));
    }
    if current == role {
        return Ok(target);
    }
    if current == Role::Owner {
        ensure_not_last_owner(&owners, &target)?;
    }

    let mut model: member::ActiveModel = target.into();
    model.role = Set(role.as_str().to_string());
    let updated = model.update(&txn).await?;
    txn.commit().await?;

    info!(member_id, %role, "Member role updated");
    Ok(updated)
}

/// Changes the caller's own display name.
pub async fn update_display_name(
    db: &DatabaseConnection,
    actor: &Membership,
    display_name: &str,
) -> Result<member::Model> {
    let display_name = required_text("Display name", display_name)?;
    let mut model: member::ActiveModel = actor.member.clone().into();
    model.display_name = Set(display_name);
    model.update(db).await.map_err(Into::into)
}

/// Removes a member from the household.
///
/// Members may always remove themselves. Removing someone else requires admin, and
/// removing an owner requires owner. The last owner can never be removed.
#[instrument(skip(db, actor))]
pub async fn remove_member(db: &DatabaseConnection, actor: &Membership, member_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let owners = lock_owners(&txn, actor.household_id).await?;
    let target = member_in_household(&txn, actor.household_id, member_id).await?;

    if target.id != actor.member_id() {
        actor.require(Role::Admin)?;
        if target.role == Role::Owner.as_str() {
            actor.require(Role::Owner)?;
        }
    }
    ensure_not_last_owner(&owners, &target)?;

    target.delete(&txn).await?;
    txn.commit().await?;

    info!(member_id, household_id = actor.household_id, "Member removed");
    Ok(())
}

/// Removes the caller from the household.
pub async fn leave_household(db: &DatabaseConnection, actor: &Membership) -> Result<()> {
    remove_member(db, actor, actor.member_id()).await
}
