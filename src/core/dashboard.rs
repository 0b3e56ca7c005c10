//! Household dashboard: one call that loads what the landing page shows.

use crate::{
    core::{
        activity::recent_activities,
        feeding::{FeedingStatus, status_for_household},
        household::get_household,
        member::list_members,
        membership::Membership,
        pet::list_pets,
    },
    entities::{activity, household, member, pet},
    errors::Result,
    models::Role,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;

/// Activities shown on the dashboard.
pub const RECENT_ACTIVITY_COUNT: u64 = 10;

/// Dashboard contents.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    /// The household
    pub household: household::Model,
    /// Caller's role
    pub role: Role,
    /// Every member
    pub members: Vec<member::Model>,
    /// Every pet
    pub pets: Vec<pet::Model>,
    /// Latest activities, newest first
    pub recent_activities: Vec<activity::Model>,
    /// Today's feeding slots and whether they are done
    pub feeding_today: Vec<FeedingStatus>,
}

/// Loads the dashboard for the caller's household.
pub async fn get_dashboard(db: &DatabaseConnection, actor: &Membership) -> Result<Dashboard> {
    Ok(Dashboard {
        household: get_household(db, actor).await?,
        role: actor.role,
        members: list_members(db, actor).await?,
        pets: list_pets(db, actor).await?,
        recent_activities: recent_activities(db, actor.household_id, RECENT_ACTIVITY_COUNT).await?,
        feeding_today: status_for_household(db, actor.household_id, Utc::now().date_naive()).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::household::create_household;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_new_household_dashboard_has_single_owner() -> Result<()> {
        let db = setup_test_db().await?;
        let (household, owner) = create_household(&db, "user_1", "X", None).await?;
        let actor = Membership::from_model(owner)?;

        let dashboard = get_dashboard(&db, &actor).await?;
        assert_eq!(dashboard.household.id, household.id);
        assert_eq!(dashboard.members.len(), 1);
        assert_eq!(dashboard.members[0].role, "owner");
        assert_eq!(dashboard.role, Role::Owner);
        assert!(dashboard.pets.is_empty());
        assert!(dashboard.feeding_today.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_dashboard_lists_pets() -> Result<()> {
        let (db, _household, owner) = setup_with_household().await?;
        create_test_pet(&db, &owner, "Rex").await?;

        let dashboard = get_dashboard(&db, &owner).await?;
        assert_eq!(dashboard.pets.len(), 1);
        assert!(dashboard.recent_activities.is_empty());
        Ok(())
    }
}
