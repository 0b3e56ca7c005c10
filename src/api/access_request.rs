//! `accessRequest.*` procedures.

use crate::{
    api::{
        AppState,
        extract::{AuthUser, ById, HouseholdMember, Input},
    },
    core::access_request::{self, NewAccessRequest},
    entities::{access_request as access_request_entity, member as member_entity},
    errors::Result,
};
use axum::{Json, Router, extract::State, routing::post};

/// Routes for access requests.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rpc/accessRequest.create", post(create))
        .route("/rpc/accessRequest.mine", post(mine))
        .route("/rpc/accessRequest.list", post(list))
        .route("/rpc/accessRequest.approve", post(approve))
        .route("/rpc/accessRequest.deny", post(deny))
}

async fn create(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Input(input): Input<NewAccessRequest>,
) -> Result<Json<access_request_entity::Model>> {
    access_request::create_request(&state.db, &user_id, input)
        .await
        .map(Json)
}

async fn mine(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<access_request_entity::Model>>> {
    access_request::my_requests(&state.db, &user_id)
        .await
        .map(Json)
}

async fn list(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
) -> Result<Json<Vec<access_request_entity::Model>>> {
    access_request::list_pending(&state.db, &actor)
        .await
        .map(Json)
}

async fn approve(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(input): Input<ById>,
) -> Result<Json<member_entity::Model>> {
    access_request::approve_request(&state.db, &actor, input.id)
        .await
        .map(Json)
}

async fn deny(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(input): Input<ById>,
) -> Result<Json<access_request_entity::Model>> {
    access_request::deny_request(&state.db, &actor, input.id)
        .await
        .map(Json)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use crate::api::test_support::{call, call_in};
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_join_code_request_and_approval() {
        let (db, household, _owner) = setup_with_household().await.unwrap();
        let (state, _storage) = test_state(db);

        let (status, request) = call(
            &state,
            "accessRequest.create",
            Some("newcomer"),
            json!({
                "join_code": household.join_code.to_lowercase(),
                "display_name": "Newcomer",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(request["status"], "pending");

        let (status, _) = call(
            &state,
            "accessRequest.create",
            Some("newcomer"),
            json!({ "join_code": household.join_code, "display_name": "Again" }),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, pending) =
            call_in(&state, "accessRequest.list", "owner_user", household.id, json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(pending.as_array().unwrap().len(), 1);

        let (status, member) = call_in(
            &state,
            "accessRequest.approve",
            "owner_user",
            household.id,
            json!({ "id": request["id"] }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(member["role"], "member");
        assert_eq!(member["user_id"], "newcomer");

        let (status, mine) = call(&state, "accessRequest.mine", Some("newcomer"), json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(mine[0]["status"], "approved");
    }

    #[tokio::test]
    async fn test_unknown_join_code_not_found() {
        let (state, _storage) = test_state(setup_test_db().await.unwrap());
        let (status, body) = call(
            &state,
            "accessRequest.create",
            Some("newcomer"),
            json!({ "join_code": "ZZZZZZZZ", "display_name": "N" }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}
