//! Household business logic - creation, lookup, theming and join codes.
//!
//! Creating a household also creates exactly one `owner` membership for the creator,
//! inside the same database transaction.

use crate::{
    core::{
        membership::Membership,
        validation::{hex_color, optional_text, required_text},
    },
    entities::{Household, Member, household, member},
    errors::{Error, Result},
    models::Role,
};
use chrono::Utc;
use rand::Rng;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const JOIN_CODE_LENGTH: usize = 8;
const JOIN_CODE_ATTEMPTS: usize = 5;

/// A household together with the caller's role in it.
#[derive(Debug, Clone, Serialize)]
pub struct HouseholdSummary {
    /// The household
    pub household: household::Model,
    /// Caller's role
    pub role: Role,
}

/// Fields that may be changed on an existing household. `None` leaves a field as is;
/// an empty string clears an optional field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HouseholdUpdate {
    /// New name
    pub name: Option<String>,
    /// New primary theme colour
    pub primary_color: Option<String>,
    /// New secondary theme colour
    pub secondary_color: Option<String>,
    /// New avatar URL
    pub avatar_url: Option<String>,
}

fn random_join_code() -> String {
    let mut rng = rand::thread_rng();
    (0..JOIN_CODE_LENGTH)
        .map(|_| char::from(JOIN_CODE_ALPHABET[rng.gen_range(0..JOIN_CODE_ALPHABET.len())]))
        .collect()
}

/// Generates a join code that is not used by any household yet.
async fn unique_join_code<C>(db: &C) -> Result<String>
where
    C: ConnectionTrait,
{
    for _ in 0..JOIN_CODE_ATTEMPTS {
        let code = random_join_code();
        if find_by_join_code(db, &code).await?.is_none() {
            return Ok(code);
        }
    }
    Err(Error::conflict("could not generate a unique join code"))
}

/// Looks up a household by join code (case-insensitive).
pub async fn find_by_join_code<C>(db: &C, code: &str) -> Result<Option<household::Model>>
where
    C: ConnectionTrait,
{
    Household::find()
        .filter(household::Column::JoinCode.eq(code.trim().to_ascii_uppercase()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a household and makes `user_id` its sole owner.
#[instrument(skip(db))]
pub async fn create_household(
    db: &DatabaseConnection,
    user_id: &str,
    name: &str,
    display_name: Option<String>,
) -> Result<(household::Model, member::Model)> {
    let name = required_text("Household name", name)?;
    let display_name = optional_text(display_name).unwrap_or_else(|| "Owner".to_string());

    let txn = db.begin().await?;
    let now = Utc::now();

    let household = household::ActiveModel {
        name: Set(name),
        primary_color: Set(None),
        secondary_color: Set(None),
        avatar_url: Set(None),
        join_code: Set(unique_join_code(&txn).await?),
        created_by: Set(user_id.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let owner = member::ActiveModel {
        household_id: Set(household.id),
        user_id: Set(user_id.to_string()),
        role: Set(Role::Owner.as_str().to_string()),
        display_name: Set(display_name),
        joined_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(household_id = household.id, "Household created");
    Ok((household, owner))
}

/// Lists every household `user_id` belongs to, ordered by name.
pub async fn list_for_user(db: &DatabaseConnection, user_id: &str) -> Result<Vec<HouseholdSummary>> {
    let rows = Member::find()
        .filter(member::Column::UserId.eq(user_id))
        .find_also_related(Household)
        .order_by_asc(household::Column::Name)
        .all(db)
        .await?;

    rows.into_iter()
        .filter_map(|(member, household)| household.map(|h| (member, h)))
        .map(|(member, household)| -> Result<HouseholdSummary> {
            Ok(HouseholdSummary {
                household,
                role: member.role.parse()?,
            })
        })
        .collect()
}

/// Loads the caller's household.
pub async fn get_household(db: &DatabaseConnection, actor: &Membership) -> Result<household::Model> {
    Household::find_by_id(actor.household_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Household", actor.household_id))
}

/// Updates name and theme. Requires admin.
#[instrument(skip(db, actor))]
pub async fn update_household(
    db: &DatabaseConnection,
    actor: &Membership,
    update: HouseholdUpdate,
) -> Result<household::Model> {
    actor.require(Role::Admin)?;
    let existing = get_household(db, actor).await?;
    let mut model: household::ActiveModel = existing.into();

    if let Some(name) = update.name {
        model.name = Set(required_text("Household name", &name)?);
    }
    if update.primary_color.is_some() {
        model.primary_color = Set(hex_color(update.primary_color)?);
    }
    if update.secondary_color.is_some() {
        model.secondary_color = Set(hex_color(update.secondary_color)?);
    }
    if update.avatar_url.is_some() {
        model.avatar_url = Set(optional_text(update.avatar_url));
    }
    model.updated_at = Set(Utc::now());

    model.update(db).await.map_err(Into::into)
}

/// Replaces the join code. Requires admin.
#[instrument(skip(db, actor))]
pub async fn regenerate_join_code(
    db: &DatabaseConnection,
    actor: &Membership,
) -> Result<household::Model> {
    actor.require(Role::Admin)?;
    let existing = get_household(db, actor).await?;
    let mut model: household::ActiveModel = existing.into();
    model.join_code = Set(unique_join_code(db).await?);
    model.updated_at = Set(Utc::now());
    let updated = model.update(db).await?;
    info!(household_id = updated.id, "Join code regenerated");
    Ok(updated)
}

/// Deletes the household and everything it owns. Requires owner.
#[instrument(skip(db, actor))]
pub async fn delete_household(db: &DatabaseConnection, actor: &Membership) -> Result<()> {
    actor.require(Role::Owner)?;
    let household = get_household(db, actor).await?;
    household.delete(db).await?;
    info!(household_id = actor.household_id, "Household deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::membership;
    use crate::entities::Pet;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase, PaginatorTrait};

    #[test]
    fn test_random_join_code_shape() {
        let code = random_join_code();
        assert_eq!(code.len(), JOIN_CODE_LENGTH);
        assert!(code.bytes().all(|b| JOIN_CODE_ALPHABET.contains(&b)));
    }

    #[tokio::test]
    async fn test_create_household_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let result = create_household(&db, "user_1", "   ", None).await;
        assert!(matches!(result.unwrap_err(), Error::BadRequest { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_household_creates_single_owner() -> Result<()> {
        let db = setup_test_db().await?;

        let (household, owner) =
            create_household(&db, "user_1", "  The Smiths ", Some("Sam".to_string())).await?;

        assert_eq!(household.name, "The Smiths");
        assert_eq!(household.join_code.len(), JOIN_CODE_LENGTH);
        assert_eq!(owner.role, "owner");
        assert_eq!(owner.display_name, "Sam");

        let members = Member::find()
            .filter(member::Column::HouseholdId.eq(household.id))
            .count(&db)
            .await?;
        assert_eq!(members, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_for_user_only_returns_own_households() -> Result<()> {
        let db = setup_test_db().await?;
        create_household(&db, "user_1", "Beta", None).await?;
        create_household(&db, "user_1", "Alpha", None).await?;
        create_household(&db, "user_2", "Gamma", None).await?;

        let mine = list_for_user(&db, "user_1").await?;
        let names: Vec<_> = mine.iter().map(|s| s.household.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);
        assert!(mine.iter().all(|s| s.role == Role::Owner));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_household_requires_admin() -> Result<()> {
        let (db, household, owner) = setup_with_household().await?;
        let member = add_member(&db, household.id, "plain_member", Role::Member).await?;

        let denied = update_household(
            &db,
            &member,
            HouseholdUpdate {
                name: Some("Nope".to_string()),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(denied, Err(Error::Forbidden { .. })));

        let updated = update_household(
            &db,
            &owner,
            HouseholdUpdate {
                name: Some("Renamed".to_string()),
                primary_color: Some("#FF0000".to_string()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.primary_color.as_deref(), Some("#ff0000"));
        Ok(())
    }

    #[tokio::test]
    async fn test_regenerate_join_code_changes_code() -> Result<()> {
        let (db, household, owner) = setup_with_household().await?;
        let updated = regenerate_join_code(&db, &owner).await?;
        assert_ne!(updated.join_code, household.join_code);

        let found = find_by_join_code(&db, &updated.join_code.to_lowercase()).await?;
        assert_eq!(found.unwrap().id, household.id);
        assert!(find_by_join_code(&db, &household.join_code).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_household_cascades() -> Result<()> {
        let (db, household, owner) = setup_with_household().await?;
        create_test_pet(&db, &owner, "Rex").await?;
        let admin = add_member(&db, household.id, "admin_user", Role::Admin).await?;

        assert!(matches!(
            delete_household(&db, &admin).await,
            Err(Error::Forbidden { .. })
        ));

        delete_household(&db, &owner).await?;
        assert!(Household::find_by_id(household.id).one(&db).await?.is_none());
        assert_eq!(Pet::find().count(&db).await?, 0);
        assert!(
            membership::find_member(&db, household.id, owner.user_id())
                .await?
                .is_none()
        );
        Ok(())
    }
}
