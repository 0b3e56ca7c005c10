//! Access requests - users asking to join a household by its join code.

use crate::{
    core::{
        household::find_by_join_code,
        membership::{Membership, find_member, insert_member},
        validation::{optional_text, required_text},
    },
    entities::{AccessRequest, access_request, member},
    errors::{Error, Result},
    models::{AccessRequestStatus, Role},
};
use chrono::Utc;
use sea_orm::{DatabaseTransaction, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use tracing::{info, instrument};

/// Input for [`create_request`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccessRequest {
    /// Household join code (case-insensitive)
    pub join_code: String,
    /// Name to show to the admins and, once approved, to the household
    pub display_name: String,
    /// Optional note
    #[serde(default)]
    pub message: Option<String>,
}

/// Asks to join the household identified by `join_code`.
#[instrument(skip(db))]
pub async fn create_request(
    db: &DatabaseConnection,
    user_id: &str,
    input: NewAccessRequest,
) -> Result<access_request::Model> {
    let display_name = required_text("Display name", &input.display_name)?;
    let household = find_by_join_code(db, &input.join_code)
        .await?
        .ok_or_else(|| Error::not_found("Household", input.join_code.trim()))?;

    if find_member(db, household.id, user_id).await?.is_some() {
        return Err(Error::conflict("already a member of this household"));
    }
    let pending = AccessRequest::find()
        .filter(access_request::Column::HouseholdId.eq(household.id))
        .filter(access_request::Column::UserId.eq(user_id))
        .filter(access_request::Column::Status.eq(AccessRequestStatus::Pending.as_str()))
        .one(db)
        .await?;
    if pending.is_some() {
        return Err(Error::conflict("a request for this household is already pending"));
    }

    let request = access_request::ActiveModel {
        household_id: Set(household.id),
        user_id: Set(user_id.to_string()),
        display_name: Set(display_name),
        message: Set(optional_text(input.message)),
        status: Set(AccessRequestStatus::Pending.as_str().to_string()),
        created_at: Set(Utc::now()),
        resolved_at: Set(None),
        resolved_by: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(request_id = request.id, household_id = household.id, "Access request created");
    Ok(request)
}

/// The caller's own requests, newest first.
pub async fn my_requests(db: &DatabaseConnection, user_id: &str) -> Result<Vec<access_request::Model>> {
    AccessRequest::find()
        .filter(access_request::Column::UserId.eq(user_id))
        .order_by_desc(access_request::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Pending requests for the household, oldest first. Requires admin.
pub async fn list_pending(db: &DatabaseConnection, actor: &Membership) -> Result<Vec<access_request::Model>> {
    actor.require(Role::Admin)?;
    AccessRequest::find()
        .filter(access_request::Column::HouseholdId.eq(actor.household_id))
        .filter(access_request::Column::Status.eq(AccessRequestStatus::Pending.as_str()))
        .order_by_asc(access_request::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Loads a pending request and holds its row lock until `txn` ends, so two admins
/// resolving the same request see each other's decision.
async fn pending_request(
    txn: &DatabaseTransaction,
    household_id: i64,
    request_id: i64,
) -> Result<access_request::Model> {
    let request = AccessRequest::find_by_id(request_id)
        .filter(access_request::Column::HouseholdId.eq(household_id))
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| Error::not_found("AccessRequest", request_id))?;
    if request.status != AccessRequestStatus::Pending.as_str() {
        return Err(Error::conflict(format!("request is already {}", request.status)));
    }
    Ok(request)
}

async fn resolve_request(
    txn: &DatabaseTransaction,
    actor: &Membership,
    request: access_request::Model,
    status: AccessRequestStatus,
) -> Result<access_request::Model> {
    let mut model: access_request::ActiveModel = request.into();
    model.status = Set(status.as_str().to_string());
    model.resolved_at = Set(Some(Utc::now()));
    model.resolved_by = Set(Some(actor.user_id().to_string()));
    model.update(txn).await.map_err(Into::into)
}

/// Approves a pending request, adding the requester with the `member` role.
/// Requires admin.
#[instrument(skip(db, actor))]
pub async fn approve_request(
    db: &DatabaseConnection,
    actor: &Membership,
    request_id: i64,
) -> Result<member::Model> {
    actor.require(Role::Admin)?;
    let txn = db.begin().await?;
    let request = pending_request(&txn, actor.household_id, request_id).await?;

    if find_member(&txn, request.household_id, &request.user_id).await?.is_some() {
        return Err(Error::conflict("requester is already a member"));
    }
    let member = insert_member(
        &txn,
        request.household_id,
        &request.user_id,
        Role::Member,
        request.display_name.clone(),
    )
    .await?;
    resolve_request(&txn, actor, request, AccessRequestStatus::Approved).await?;
    txn.commit().await?;

    info!(request_id, member_id = member.id, "Access request approved");
    Ok(member)
}

/// Denies a pending request. Requires admin.
#[instrument(skip(db, actor))]
pub async fn deny_request(
    db: &DatabaseConnection,
    actor: &Membership,
    request_id: i64,
) -> Result<access_request::Model> {
    actor.require(Role::Admin)?;
    let txn = db.begin().await?;
    let request = pending_request(&txn, actor.household_id, request_id).await?;
    let denied = resolve_request(&txn, actor, request, AccessRequestStatus::Denied).await?;
    txn.commit().await?;

    info!(request_id, "Access request denied");
    Ok(denied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::member::list_members;
    use crate::test_utils::*;

    fn request(join_code: &str) -> NewAccessRequest {
        NewAccessRequest {
            join_code: join_code.to_string(),
            display_name: "Casey".to_string(),
            message: Some("Hi, I walk the dog on Tuesdays".to_string()),
        }
    }

    #[tokio::test]
    async fn test_request_with_unknown_code_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_request(&db, "user", request("NOPE2345")).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_request_when_already_member_conflicts() -> Result<()> {
        let (db, household, owner) = setup_with_household().await?;
        let result = create_request(&db, owner.user_id(), request(&household.join_code)).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_pending_request_conflicts() -> Result<()> {
        let (db, household, _owner) = setup_with_household().await?;
        let code = household.join_code.to_lowercase();
        create_request(&db, "casey", request(&code)).await?;

        let again = create_request(&db, "casey", request(&code)).await;
        assert!(matches!(again, Err(Error::Conflict { .. })));
        assert_eq!(my_requests(&db, "casey").await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_approve_creates_member() -> Result<()> {
        let (db, household, owner) = setup_with_household().await?;
        let pending = create_request(&db, "casey", request(&household.join_code)).await?;
        assert_eq!(list_pending(&db, &owner).await?.len(), 1);

        let member = approve_request(&db, &owner, pending.id).await?;
        assert_eq!(member.role, "member");
        assert_eq!(member.display_name, "Casey");

        let mine = my_requests(&db, "casey").await?;
        assert_eq!(mine[0].status, "approved");
        assert_eq!(mine[0].resolved_by.as_deref(), Some(owner.user_id()));
        assert!(list_pending(&db, &owner).await?.is_empty());

        assert!(matches!(
            approve_request(&db, &owner, pending.id).await,
            Err(Error::Conflict { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_deny_does_not_create_member() -> Result<()> {
        let (db, household, owner) = setup_with_household().await?;
        let pending = create_request(&db, "casey", request(&household.join_code)).await?;

        let denied = deny_request(&db, &owner, pending.id).await?;
        assert_eq!(denied.status, "denied");
        assert_eq!(list_members(&db, &owner).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_member_cannot_approve() -> Result<()> {
        let (db, household, _owner) = setup_with_household().await?;
        let member = add_member(&db, household.id, "member", Role::Member).await?;
        let pending = create_request(&db, "casey", request(&household.join_code)).await?;

        assert!(matches!(
            approve_request(&db, &member, pending.id).await,
            Err(Error::Forbidden { .. })
        ));
        Ok(())
    }
}
