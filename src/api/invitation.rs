//! `invitation.*` procedures. `getByToken` is public so that an invitee can see
//! what they are being invited to before signing in.

use crate::{
    api::{
        AppState, ok,
        extract::{AuthUser, ById, HouseholdMember, Input},
    },
    core::invitation::{self, InvitationPreview, NewInvitation},
    entities::{invitation as invitation_entity, member as member_entity},
    errors::Result,
};
use axum::{Json, Router, extract::State, routing::post};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Input naming an invitation by token.
#[derive(Debug, Deserialize)]
pub struct ByToken {
    /// Invitation token
    pub token: String,
}

/// Input for `invitation.accept`.
#[derive(Debug, Deserialize)]
pub struct AcceptInvitation {
    /// Invitation token
    pub token: String,
    /// Name to join under
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Routes for invitations.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rpc/invitation.create", post(create))
        .route("/rpc/invitation.list", post(list))
        .route("/rpc/invitation.revoke", post(revoke))
        .route("/rpc/invitation.getByToken", post(get_by_token))
        .route("/rpc/invitation.accept", post(accept))
        .route("/rpc/invitation.decline", post(decline))
}

async fn create(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(input): Input<NewInvitation>,
) -> Result<Json<invitation_entity::Model>> {
    invitation::create_invitation(&state.db, &actor, input)
        .await
        .map(Json)
}

async fn list(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
) -> Result<Json<Vec<invitation_entity::Model>>> {
    invitation::list_pending(&state.db, &actor).await.map(Json)
}

async fn revoke(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(input): Input<ById>,
) -> Result<Json<Value>> {
    invitation::revoke_invitation(&state.db, &actor, input.id).await?;
    Ok(ok())
}

async fn get_by_token(
    State(state): State<AppState>,
    Input(input): Input<ByToken>,
) -> Result<Json<InvitationPreview>> {
    invitation::get_by_token(&state.db, &input.token)
        .await
        .map(Json)
}

async fn accept(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Input(input): Input<AcceptInvitation>,
) -> Result<Json<member_entity::Model>> {
    invitation::accept_invitation(&state.db, &user_id, &input.token, input.display_name)
        .await
        .map(Json)
}

async fn decline(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Input(input): Input<ByToken>,
) -> Result<Json<invitation_entity::Model>> {
    debug!(user_id = %user_id, "Declining invitation");
    invitation::decline_invitation(&state.db, &input.token)
        .await
        .map(Json)
}
