//! `household.*` and `member.*` procedures.

use crate::{
    api::{
        AppState, ok,
        extract::{AuthUser, HouseholdMember, Input},
    },
    core::{
        household::{self, HouseholdSummary, HouseholdUpdate},
        member,
    },
    entities::{household as household_entity, member as member_entity},
    errors::Result,
    models::Role,
};
use axum::{Json, Router, extract::State, routing::post};
use serde::Deserialize;
use serde_json::Value;

/// Input for `household.create`.
#[derive(Debug, Deserialize)]
pub struct CreateHousehold {
    /// Household name
    pub name: String,
    /// Name the creator is shown under; defaults to "Owner"
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Input for `member.updateRole`.
#[derive(Debug, Deserialize)]
pub struct UpdateRole {
    /// Member to change
    pub member_id: i64,
    /// New role
    pub role: Role,
}

/// Input for `member.updateDisplayName`.
#[derive(Debug, Deserialize)]
pub struct UpdateDisplayName {
    /// New display name
    pub display_name: String,
}

/// Input for `member.remove`.
#[derive(Debug, Deserialize)]
pub struct RemoveMember {
    /// Member to remove
    pub member_id: i64,
}

/// Routes for households and their members.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rpc/household.list", post(list))
        .route("/rpc/household.create", post(create))
        .route("/rpc/household.get", post(get))
        .route("/rpc/household.update", post(update))
        .route("/rpc/household.regenerateJoinCode", post(regenerate_join_code))
        .route("/rpc/household.delete", post(delete))
        .route("/rpc/member.list", post(list_members))
        .route("/rpc/member.updateRole", post(update_role))
        .route("/rpc/member.updateDisplayName", post(update_display_name))
        .route("/rpc/member.remove", post(remove_member))
        .route("/rpc/member.leave", post(leave))
}

async fn list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<HouseholdSummary>>> {
    household::list_for_user(&state.db, &user_id).await.map(Json)
}

async fn create(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Input(input): Input<CreateHousehold>,
) -> Result<Json<HouseholdSummary>> {
    let (household, _owner) =
        household::create_household(&state.db, &user_id, &input.name, input.display_name).await?;
    Ok(Json(HouseholdSummary {
        household,
        role: Role::Owner,
    }))
}

async fn get(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
) -> Result<Json<household_entity::Model>> {
    household::get_household(&state.db, &actor).await.map(Json)
}

async fn update(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(changes): Input<HouseholdUpdate>,
) -> Result<Json<household_entity::Model>> {
    household::update_household(&state.db, &actor, changes)
        .await
        .map(Json)
}

async fn regenerate_join_code(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
) -> Result<Json<household_entity::Model>> {
    household::regenerate_join_code(&state.db, &actor)
        .await
        .map(Json)
}

async fn delete(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
) -> Result<Json<Value>> {
    household::delete_household(&state.db, &actor).await?;
    Ok(ok())
}

async fn list_members(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
) -> Result<Json<Vec<member_entity::Model>>> {
    member::list_members(&state.db, &actor).await.map(Json)
}

async fn update_role(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(input): Input<UpdateRole>,
) -> Result<Json<member_entity::Model>> {
    member::update_role(&state.db, &actor, input.member_id, input.role)
        .await
        .map(Json)
}

async fn update_display_name(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(input): Input<UpdateDisplayName>,
) -> Result<Json<member_entity::Model>> {
    member::update_display_name(&state.db, &actor, &input.display_name)
        .await
        .map(Json)
}

async fn remove_member(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(input): Input<RemoveMember>,
) -> Result<Json<Value>> {
    member::remove_member(&state.db, &actor, input.member_id).await?;
    Ok(ok())
}

async fn leave(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
) -> Result<Json<Value>> {
    member::leave_household(&state.db, &actor).await?;
    Ok(ok())
}
