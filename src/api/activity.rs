//! `activity.*` procedures.

use crate::{
    api::{
        AppState, ok,
        extract::{ById, HouseholdMember, Input, Patch},
    },
    core::activity::{self, ActivityFilter, ActivityUpdate, NewActivity},
    entities::activity as activity_entity,
    errors::Result,
};
use axum::{Json, Router, extract::State, routing::post};
use serde_json::Value;

/// Routes for activities.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rpc/activity.list", post(list))
        .route("/rpc/activity.create", post(create))
        .route("/rpc/activity.update", post(update))
        .route("/rpc/activity.complete", post(complete))
        .route("/rpc/activity.delete", post(delete))
}

async fn list(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(filter): Input<ActivityFilter>,
) -> Result<Json<Vec<activity_entity::Model>>> {
    activity::list_activities(&state.db, &actor, filter)
        .await
        .map(Json)
}

async fn create(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(input): Input<NewActivity>,
) -> Result<Json<activity_entity::Model>> {
    activity::create_activity(&state.db, &actor, input)
        .await
        .map(Json)
}

async fn update(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(patch): Input<Patch<ActivityUpdate>>,
) -> Result<Json<activity_entity::Model>> {
    activity::update_activity(&state.db, &actor, patch.id, patch.changes)
        .await
        .map(Json)
}

async fn complete(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(input): Input<ById>,
) -> Result<Json<activity_entity::Model>> {
    activity::complete_activity(&state.db, &actor, input.id)
        .await
        .map(Json)
}

async fn delete(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(input): Input<ById>,
) -> Result<Json<Value>> {
    activity::delete_activity(&state.db, &actor, input.id).await?;
    Ok(ok())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use crate::api::test_support::call_in;
    use crate::models::Role;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_sitter_logs_and_completes_but_cannot_delete() {
        let (db, household, owner) = setup_with_household().await.unwrap();
        let pet = create_test_pet(&db, &owner, "Rex").await.unwrap();
        add_member(&db, household.id, "sitter_user", Role::Sitter)
            .await
            .unwrap();
        let (state, _storage) = test_state(db);

        let (status, scheduled) = call_in(
            &state,
            "activity.create",
            "sitter_user",
            household.id,
            json!({
                "pet_id": pet.id,
                "kind": "walk",
                "title": "Evening walk",
                "scheduled_at": "2099-01-01T18:00:00Z",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(scheduled["completed_at"].is_null());
        let id = scheduled["id"].as_i64().unwrap();

        let (status, done) =
            call_in(&state, "activity.complete", "sitter_user", household.id, json!({ "id": id })).await;
        assert_eq!(status, StatusCode::OK);
        assert!(done["completed_at"].is_string());

        let (status, _) =
            call_in(&state, "activity.complete", "sitter_user", household.id, json!({ "id": id })).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) =
            call_in(&state, "activity.delete", "sitter_user", household.id, json!({ "id": id })).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_list_honours_limit() {
        let (db, household, owner) = setup_with_household().await.unwrap();
        let pet = create_test_pet(&db, &owner, "Rex").await.unwrap();
        let (state, _storage) = test_state(db);

        for title in ["Walk", "Play"] {
            let (status, _) = call_in(
                &state,
                "activity.create",
                "owner_user",
                household.id,
                json!({ "pet_id": pet.id, "kind": "play", "title": title }),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, listed) =
            call_in(&state, "activity.list", "owner_user", household.id, json!({ "limit": 1 })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }
}
