//! Activity business logic - logging, scheduling and completing pet activities.
//!
//! An activity created without `scheduled_at` is a log entry and is completed on
//! creation. One created with `scheduled_at` is planned and stays open until somebody
//! completes it.

use crate::{
    core::{
        membership::{Membership, pet_in_household},
        validation::{optional_text, required_text},
    },
    entities::{Activity, activity},
    errors::{Error, Result},
    models::{ActivityKind, Role},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*};
use serde::Deserialize;
use tracing::{info, instrument};

/// Default page size for [`list_activities`].
pub const DEFAULT_LIST_LIMIT: u64 = 50;
const MAX_LIST_LIMIT: u64 = 200;

/// Filters for [`list_activities`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityFilter {
    /// Only activities for this pet
    #[serde(default)]
    pub pet_id: Option<i64>,
    /// Maximum rows to return
    #[serde(default)]
    pub limit: Option<u64>,
}

/// Input for [`create_activity`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewActivity {
    /// Pet the activity is for
    pub pet_id: i64,
    /// Activity kind
    pub kind: ActivityKind,
    /// Title
    pub title: String,
    /// Notes
    #[serde(default)]
    pub notes: Option<String>,
    /// Planned time; omit to log something that already happened
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Changes to an existing activity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityUpdate {
    /// New kind
    pub kind: Option<ActivityKind>,
    /// New title
    pub title: Option<String>,
    /// New notes; empty string clears
    pub notes: Option<String>,
    /// New planned time
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Lists activities, newest first.
pub async fn list_activities(
    db: &DatabaseConnection,
    actor: &Membership,
    filter: ActivityFilter,
) -> Result<Vec<activity::Model>> {
    let limit = filter
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    let mut query = Activity::find().filter(activity::Column::HouseholdId.eq(actor.household_id));
    if let Some(pet_id) = filter.pet_id {
        query = query.filter(activity::Column::PetId.eq(pet_id));
    }
    query
        .order_by_desc(activity::Column::CreatedAt)
        .order_by_desc(activity::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The most recent activities of a household.
pub async fn recent_activities(
    db: &DatabaseConnection,
    household_id: i64,
    limit: u64,
) -> Result<Vec<activity::Model>> {
    Activity::find()
        .filter(activity::Column::HouseholdId.eq(household_id))
        .order_by_desc(activity::Column::CreatedAt)
        .order_by_desc(activity::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn activity_in_household(
    db: &DatabaseConnection,
    household_id: i64,
    activity_id: i64,
) -> Result<activity::Model> {
    Activity::find_by_id(activity_id)
        .filter(activity::Column::HouseholdId.eq(household_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Activity", activity_id))
}

/// Logs or schedules an activity. Open to every role, sitters included.
#[instrument(skip(db, actor))]
pub async fn create_activity(
    db: &DatabaseConnection,
    actor: &Membership,
    input: NewActivity,
) -> Result<activity::Model> {
    let title = required_text("Title", &input.title)?;
    pet_in_household(db, actor.household_id, input.pet_id).await?;
    let now = Utc::now();

    let activity = activity::ActiveModel {
        household_id: Set(actor.household_id),
        pet_id: Set(input.pet_id),
        member_id: Set(Some(actor.member_id())),
        kind: Set(input.kind.as_str().to_string()),
        title: Set(title),
        notes: Set(optional_text(input.notes)),
        scheduled_at: Set(input.scheduled_at),
        completed_at: Set(input.scheduled_at.is_none().then_some(now)),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(activity_id = activity.id, kind = %input.kind, "Activity created");
    Ok(activity)
}

/// Edits an activity. Requires member.
#[instrument(skip(db, actor))]
pub async fn update_activity(
    db: &DatabaseConnection,
    actor: &Membership,
    activity_id: i64,
    update: ActivityUpdate,
) -> Result<activity::Model> {
    actor.require(Role::Member)?;
    let existing = activity_in_household(db, actor.household_id, activity_id).await?;
    let mut model: activity::ActiveModel = existing.into();

    if let Some(kind) = update.kind {
        model.kind = Set(kind.as_str().to_string());
    }
    if let Some(title) = update.title {
        model.title = Set(required_text("Title", &title)?);
    }
    if update.notes.is_some() {
        model.notes = Set(optional_text(update.notes));
    }
    if let Some(scheduled_at) = update.scheduled_at {
        model.scheduled_at = Set(Some(scheduled_at));
    }

    model.update(db).await.map_err(Into::into)
}

/// Marks an activity done now. Open to every role.
#[instrument(skip(db, actor))]
pub async fn complete_activity(
    db: &DatabaseConnection,
    actor: &Membership,
    activity_id: i64,
) -> Result<activity::Model> {
    let existing = activity_in_household(db, actor.household_id, activity_id).await?;
    if existing.completed_at.is_some() {
        return Err(Error::conflict("activity is already completed"));
    }

    let mut model: activity::ActiveModel = existing.into();
    model.completed_at = Set(Some(Utc::now()));
    let updated = model.update(db).await?;
    info!(activity_id, member_id = actor.member_id(), "Activity completed");
    Ok(updated)
}

/// Deletes an activity. Requires member.
#[instrument(skip(db, actor))]
pub async fn delete_activity(db: &DatabaseConnection, actor: &Membership, activity_id: i64) -> Result<()> {
    actor.require(Role::Member)?;
    let existing = activity_in_household(db, actor.household_id, activity_id).await?;
    existing.delete(db).await?;
    info!(activity_id, "Activity deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use chrono::Duration;

    fn walk(pet_id: i64, scheduled_at: Option<DateTime<Utc>>) -> NewActivity {
        NewActivity {
            pet_id,
            kind: ActivityKind::Walk,
            title: "Morning walk".to_string(),
            notes: None,
            scheduled_at,
        }
    }

    #[tokio::test]
    async fn test_log_is_completed_and_schedule_is_open() -> Result<()> {
        let (db, household, owner) = setup_with_household().await?;
        let pet = create_test_pet(&db, &owner, "Rex").await?;
        let sitter = add_member(&db, household.id, "sitter", Role::Sitter).await?;

        let logged = create_activity(&db, &sitter, walk(pet.id, None)).await?;
        assert!(logged.completed_at.is_some());
        assert_eq!(logged.member_id, Some(sitter.member_id()));

        let planned =
            create_activity(&db, &owner, walk(pet.id, Some(Utc::now() + Duration::days(1)))).await?;
        assert!(planned.completed_at.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_complete_twice_conflicts() -> Result<()> {
        let (db, household, owner) = setup_with_household().await?;
        let pet = create_test_pet(&db, &owner, "Rex").await?;
        let sitter = add_member(&db, household.id, "sitter", Role::Sitter).await?;
        let planned =
            create_activity(&db, &owner, walk(pet.id, Some(Utc::now() + Duration::hours(2)))).await?;

        let done = complete_activity(&db, &sitter, planned.id).await?;
        assert!(done.completed_at.is_some());
        assert!(matches!(
            complete_activity(&db, &sitter, planned.id).await,
            Err(Error::Conflict { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_filters_by_pet_and_limit() -> Result<()> {
        let (db, _household, owner) = setup_with_household().await?;
        let rex = create_test_pet(&db, &owner, "Rex").await?;
        let tom = create_test_pet(&db, &owner, "Tom").await?;
        for _ in 0..3 {
            create_activity(&db, &owner, walk(rex.id, None)).await?;
        }
        create_activity(&db, &owner, walk(tom.id, None)).await?;

        let all = list_activities(&db, &owner, ActivityFilter::default()).await?;
        assert_eq!(all.len(), 4);

        let rex_only = list_activities(
            &db,
            &owner,
            ActivityFilter {
                pet_id: Some(rex.id),
                limit: Some(2),
            },
        )
        .await?;
        assert_eq!(rex_only.len(), 2);
        assert!(rex_only.iter().all(|a| a.pet_id == rex.id));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_for_foreign_pet_not_found() -> Result<()> {
        let (db, _household, owner) = setup_with_household().await?;
        let (_other, stranger) = create_test_household(&db, "Other", "stranger").await?;
        let pet = create_test_pet(&db, &owner, "Rex").await?;

        let result = create_activity(&db, &stranger, walk(pet.id, None)).await;
        assert!(matches!(result, Err(Error::NotFound { entity: "Pet", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_and_delete_require_member() -> Result<()> {
        let (db, household, owner) = setup_with_household().await?;
        let pet = create_test_pet(&db, &owner, "Rex").await?;
        let sitter = add_member(&db, household.id, "sitter", Role::Sitter).await?;
        let activity = create_activity(&db, &sitter, walk(pet.id, None)).await?;

        assert!(matches!(
            delete_activity(&db, &sitter, activity.id).await,
            Err(Error::Forbidden { .. })
        ));

        let updated = update_activity(
            &db,
            &owner,
            activity.id,
            ActivityUpdate {
                kind: Some(ActivityKind::Play),
                notes: Some("fetch".to_string()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(updated.kind, "play");
        assert_eq!(updated.notes.as_deref(), Some("fetch"));

        delete_activity(&db, &owner, activity.id).await?;
        assert!(list_activities(&db, &owner, ActivityFilter::default()).await?.is_empty());
        Ok(())
    }
}
