//! `pet.*` procedures.

use crate::{
    api::{
        AppState, ok,
        extract::{ById, HouseholdMember, Input, Patch},
    },
    core::pet::{self, NewPet, PetUpdate},
    entities::pet as pet_entity,
    errors::{Error, Result},
    storage::MAX_AVATAR_BYTES,
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    routing::post,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Deserialize;
use serde_json::Value;

/// Request body limit for `pet.uploadAvatar`: a base64-encoded image of
/// [`MAX_AVATAR_BYTES`] plus room for a `data:` prefix and the JSON fields.
/// The image size itself is enforced by [`crate::storage::validate_avatar`].
pub const AVATAR_BODY_LIMIT: usize = MAX_AVATAR_BYTES.div_ceil(3) * 4 + 64 * 1024;

/// Input for `pet.uploadAvatar`.
#[derive(Debug, Deserialize)]
pub struct UploadAvatar {
    /// Pet to attach the avatar to
    pub pet_id: i64,
    /// Base64 image bytes, optionally as a `data:` URL
    pub data: String,
    /// `image/jpeg`, `image/png` or `image/webp`
    pub mime_type: String,
}

/// Input for `pet.removeAvatar`.
#[derive(Debug, Deserialize)]
pub struct RemoveAvatar {
    /// Pet whose avatar to drop
    pub pet_id: i64,
}

/// Routes for pets.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rpc/pet.list", post(list))
        .route("/rpc/pet.get", post(get))
        .route("/rpc/pet.create", post(create))
        .route("/rpc/pet.update", post(update))
        .route("/rpc/pet.delete", post(delete))
        .route(
            "/rpc/pet.uploadAvatar",
            post(upload_avatar).layer(DefaultBodyLimit::max(AVATAR_BODY_LIMIT)),
        )
        .route("/rpc/pet.removeAvatar", post(remove_avatar))
}

/// Decodes a base64 payload, accepting a `data:<mime>;base64,` prefix.
fn decode_image(data: &str) -> Result<Vec<u8>> {
    let payload = match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::bad_request(format!("Image data is not valid base64: {e}")))
}

async fn list(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
) -> Result<Json<Vec<pet_entity::Model>>> {
    pet::list_pets(&state.db, &actor).await.map(Json)
}

async fn get(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(input): Input<ById>,
) -> Result<Json<pet_entity::Model>> {
    pet::get_pet(&state.db, &actor, input.id).await.map(Json)
}

async fn create(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(input): Input<NewPet>,
) -> Result<Json<pet_entity::Model>> {
    pet::create_pet(&state.db, &actor, input).await.map(Json)
}

async fn update(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(patch): Input<Patch<PetUpdate>>,
) -> Result<Json<pet_entity::Model>> {
    pet::update_pet(&state.db, &actor, patch.id, patch.changes)
        .await
        .map(Json)
}

async fn delete(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(input): Input<ById>,
) -> Result<Json<Value>> {
    pet::delete_pet(&state.db, state.storage.as_ref(), &actor, input.id).await?;
    Ok(ok())
}

async fn upload_avatar(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(input): Input<UploadAvatar>,
) -> Result<Json<pet_entity::Model>> {
    let bytes = decode_image(&input.data)?;
    pet::upload_avatar(
        &state.db,
        state.storage.as_ref(),
        &actor,
        input.pet_id,
        bytes,
        &input.mime_type,
    )
    .await
    .map(Json)
}

async fn remove_avatar(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(input): Input<RemoveAvatar>,
) -> Result<Json<pet_entity::Model>> {
    pet::remove_avatar(&state.db, state.storage.as_ref(), &actor, input.pet_id)
        .await
        .map(Json)
}
