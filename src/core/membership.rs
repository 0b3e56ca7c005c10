//! Household membership resolution and role checks.
//!
//! Every household-scoped operation receives a [`Membership`] describing the acting
//! member. Resolving one is the authorization boundary: a user who is not a member of
//! the household gets [`Error::Forbidden`], and a member whose role is too low for an
//! action gets the same from [`Membership::require`].

use crate::{
    entities::{Member, Pet, member, pet},
    errors::{Error, Result},
    models::Role,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, SqlErr,
};
use tracing::debug;

/// The acting member of a household.
#[derive(Debug, Clone)]
pub struct Membership {
    /// Household the request is scoped to
    pub household_id: i64,
    /// The caller's membership row
    pub member: member::Model,
    /// Parsed role of the caller
    pub role: Role,
}

impl Membership {
    /// Builds a membership from a stored row.
    pub fn from_model(member: member::Model) -> Result<Self> {
        let role = member.role.parse()?;
        Ok(Self {
            household_id: member.household_id,
            member,
            role,
        })
    }

    /// Identity-provider user id of the caller.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.member.user_id
    }

    /// Member id of the caller.
    #[must_use]
    pub const fn member_id(&self) -> i64 {
        self.member.id
    }

    /// Fails with [`Error::Forbidden`] unless the caller holds at least `required`.
    pub fn require(&self, required: Role) -> Result<()> {
        if self.role.at_least(required) {
            Ok(())
        } else {
            Err(Error::forbidden(format!(
                "requires {required} role, caller is {}",
                self.role
            )))
        }
    }
}

/// Finds `user_id`'s membership row in `household_id`, if any.
pub async fn find_member<C>(db: &C, household_id: i64, user_id: &str) -> Result<Option<member::Model>>
where
    C: ConnectionTrait,
{
    Member::find()
        .filter(member::Column::HouseholdId.eq(household_id))
        .filter(member::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Resolves the caller's membership in a household.
pub async fn resolve<C>(db: &C, household_id: i64, user_id: &str) -> Result<Membership>
where
    C: ConnectionTrait,
{
    debug!(household_id, user_id, "Resolving household membership");
    let member = find_member(db, household_id, user_id)
        .await?
        .ok_or_else(|| Error::forbidden("not a member of this household"))?;
    Membership::from_model(member)
}

/// Loads the owners of a household, ordered by id, holding a row lock on each
/// (`SELECT ... FOR UPDATE`) until the surrounding transaction ends.
///
/// Concurrent role changes and removals queue behind each other here, so the owner
/// set they check is the one they modify.
pub async fn lock_owners<C>(db: &C, household_id: i64) -> Result<Vec<member::Model>>
where
    C: ConnectionTrait,
{
    Member::find()
        .filter(member::Column::HouseholdId.eq(household_id))
        .filter(member::Column::Role.eq(Role::Owner.as_str()))
        .order_by_asc(member::Column::Id)
        .lock_exclusive()
        .all(db)
        .await
        .map_err(Into::into)
}

/// Adds `user_id` to a household. A concurrent duplicate is caught by the
/// (household, user) unique index and reported as [`Error::Conflict`].
pub async fn insert_member<C>(
    db: &C,
    household_id: i64,
    user_id: &str,
    role: Role,
    display_name: String,
) -> Result<member::Model>
where
    C: ConnectionTrait,
{
    let result = member::ActiveModel {
        household_id: Set(household_id),
        user_id: Set(user_id.to_string()),
        role: Set(role.as_str().to_string()),
        display_name: Set(display_name),
        joined_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await;

    match result {
        Ok(member) => Ok(member),
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Err(Error::conflict("already a member of this household"))
        }
        Err(e) => Err(e.into()),
    }
}

/// Loads a pet and checks it belongs to the household.
pub async fn pet_in_household<C>(db: &C, household_id: i64, pet_id: i64) -> Result<pet::Model>
where
    C: ConnectionTrait,
{
    Pet::find_by_id(pet_id)
        .filter(pet::Column::HouseholdId.eq(household_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Pet", pet_id))
}
