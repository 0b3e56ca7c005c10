//! `feeding.*` procedures.

use crate::{
    api::{
        AppState, ok,
        extract::{ById, HouseholdMember, Input, Patch, PetFilter},
    },
    core::feeding::{self, FeedingStatus, NewSchedule, ScheduleUpdate},
    entities::{feeding_log, feeding_schedule},
    errors::Result,
};
use axum::{Json, Router, extract::State, routing::post};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

/// Input for `feeding.status`.
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    /// Day to report; today (UTC) when omitted
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// Input for `feeding.logCompletion` and `feeding.undoCompletion`.
#[derive(Debug, Deserialize)]
pub struct Completion {
    /// Schedule slot
    pub schedule_id: i64,
    /// Day of the slot; today (UTC) when omitted
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Note stored with the log
    #[serde(default)]
    pub notes: Option<String>,
}

/// Routes for feeding schedules and logs.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rpc/feeding.listSchedules", post(list_schedules))
        .route("/rpc/feeding.createSchedule", post(create_schedule))
        .route("/rpc/feeding.updateSchedule", post(update_schedule))
        .route("/rpc/feeding.deleteSchedule", post(delete_schedule))
        .route("/rpc/feeding.status", post(status))
        .route("/rpc/feeding.logCompletion", post(log_completion))
        .route("/rpc/feeding.undoCompletion", post(undo_completion))
}

async fn list_schedules(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(filter): Input<PetFilter>,
) -> Result<Json<Vec<feeding_schedule::Model>>> {
    feeding::list_schedules(&state.db, &actor, filter.pet_id)
        .await
        .map(Json)
}

async fn create_schedule(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(input): Input<NewSchedule>,
) -> Result<Json<feeding_schedule::Model>> {
    feeding::create_schedule(&state.db, &actor, input)
        .await
        .map(Json)
}

async fn update_schedule(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(patch): Input<Patch<ScheduleUpdate>>,
) -> Result<Json<feeding_schedule::Model>> {
    feeding::update_schedule(&state.db, &actor, patch.id, patch.changes)
        .await
        .map(Json)
}

async fn delete_schedule(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(input): Input<ById>,
) -> Result<Json<Value>> {
    feeding::delete_schedule(&state.db, &actor, input.id).await?;
    Ok(ok())
}

async fn status(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(query): Input<StatusQuery>,
) -> Result<Json<Vec<FeedingStatus>>> {
    feeding::feeding_status(&state.db, &actor, query.date)
        .await
        .map(Json)
}

async fn log_completion(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(input): Input<Completion>,
) -> Result<Json<feeding_log::Model>> {
    feeding::log_completion(&state.db, &actor, input.schedule_id, input.date, input.notes)
        .await
        .map(Json)
}

async fn undo_completion(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(input): Input<Completion>,
) -> Result<Json<Value>> {
    feeding::undo_completion(&state.db, &actor, input.schedule_id, input.date).await?;
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
    async fn test_sitter_logs_feeding_twice_without_duplicates() {
        let (db, household, owner) = setup_with_household().await.unwrap();
        let pet = create_test_pet(&db, &owner, "Rex").await.unwrap();
        add_member(&db, household.id, "sitter_user", Role::Sitter)
            .await
            .unwrap();
        let (state, _storage) = test_state(db);

        let (status, schedule) = call_in(
            &state,
            "feeding.createSchedule",
            "owner_user",
            household.id,
            json!({ "pet_id": pet.id, "label": "Breakfast", "time_of_day": "7:30" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(schedule["time_of_day"], "07:30");

        let completion = json!({ "schedule_id": schedule["id"], "date": "2024-05-01" });
        let (status, first) = call_in(
            &state,
            "feeding.logCompletion",
            "sitter_user",
            household.id,
            completion.clone(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (status, second) = call_in(
            &state,
            "feeding.logCompletion",
            "sitter_user",
            household.id,
            completion.clone(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["id"], second["id"]);

        let (_, board) = call_in(
            &state,
            "feeding.status",
            "sitter_user",
            household.id,
            json!({ "date": "2024-05-01" }),
        )
        .await;
        assert_eq!(board[0]["done"], true);
        assert_eq!(board[0]["pet_name"], "Rex");

        let (status, _) = call_in(
            &state,
            "feeding.undoCompletion",
            "sitter_user",
            household.id,
            completion,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (_, board) = call_in(
            &state,
            "feeding.status",
            "sitter_user",
            household.id,
            json!({ "date": "2024-05-01" }),
        )
        .await;
        assert_eq!(board[0]["done"], false);
    }

    #[tokio::test]
    async fn test_bad_time_of_day_rejected() {
        let (db, household, owner) = setup_with_household().await.unwrap();
        let pet = create_test_pet(&db, &owner, "Rex").await.unwrap();
        let (state, _storage) = test_state(db);

        let (status, _) = call_in(
            &state,
            "feeding.createSchedule",
            "owner_user",
            household.id,
            json!({ "pet_id": pet.id, "label": "Dinner", "time_of_day": "25:00" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
