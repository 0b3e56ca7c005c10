//! Pet business logic - CRUD and avatar handling.

use crate::{
    core::{
        dates::start_of_day,
        membership::{Membership, pet_in_household},
        validation::{optional_text, positive_amount, required_text},
    },
    entities::{Pet, pet},
    errors::Result,
    models::Role,
    storage::{self, AvatarStorage},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

/// Input for [`create_pet`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPet {
    /// Pet name
    pub name: String,
    /// Species (e.g., "dog")
    pub species: String,
    /// Breed
    #[serde(default)]
    pub breed: Option<String>,
    /// Sex
    #[serde(default)]
    pub sex: Option<String>,
    /// Date of birth
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    /// Weight in kilograms
    #[serde(default)]
    pub weight_kg: Option<f64>,
    /// Microchip id
    #[serde(default)]
    pub microchip_id: Option<String>,
    /// Notes
    #[serde(default)]
    pub notes: Option<String>,
}

/// Changes to an existing pet. `None` leaves a field unchanged; an empty string
/// clears an optional text field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PetUpdate {
    /// New name
    pub name: Option<String>,
    /// New species
    pub species: Option<String>,
    /// New breed
    pub breed: Option<String>,
    /// New sex
    pub sex: Option<String>,
    /// New date of birth
    pub date_of_birth: Option<NaiveDate>,
    /// New weight in kilograms
    pub weight_kg: Option<f64>,
    /// New microchip id
    pub microchip_id: Option<String>,
    /// New notes
    pub notes: Option<String>,
}

/// Lists the household's pets by name.
pub async fn list_pets(db: &DatabaseConnection, actor: &Membership) -> Result<Vec<pet::Model>> {
    debug!(household_id = actor.household_id, "Listing pets");
    Pet::find()
        .filter(pet::Column::HouseholdId.eq(actor.household_id))
        .order_by_asc(pet::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Loads one pet of the household.
pub async fn get_pet(db: &DatabaseConnection, actor: &Membership, pet_id: i64) -> Result<pet::Model> {
    pet_in_household(db, actor.household_id, pet_id).await
}

/// Adds a pet. Requires member.
#[instrument(skip(db, actor))]
pub async fn create_pet(db: &DatabaseConnection, actor: &Membership, input: NewPet) -> Result<pet::Model> {
    actor.require(Role::Member)?;
    let name = required_text("Pet name", &input.name)?;
    let species = required_text("Species", &input.species)?;
    let weight_kg = input.weight_kg.map(positive_amount).transpose()?;
    let now = Utc::now();

    let pet = pet::ActiveModel {
        household_id: Set(actor.household_id),
        name: Set(name),
        species: Set(species),
        breed: Set(optional_text(input.breed)),
        sex: Set(optional_text(input.sex)),
        date_of_birth: Set(input.date_of_birth.map(start_of_day)),
        weight_kg: Set(weight_kg),
        microchip_id: Set(optional_text(input.microchip_id)),
        notes: Set(optional_text(input.notes)),
        avatar_url: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(pet_id = pet.id, household_id = pet.household_id, "Pet created");
    Ok(pet)
}

/// Updates a pet. Requires member.
#[instrument(skip(db, actor))]
pub async fn update_pet(
    db: &DatabaseConnection,
    actor: &Membership,
    pet_id: i64,
    update: PetUpdate,
) -> Result<pet::Model> {
    actor.require(Role::Member)?;
    let existing = pet_in_household(db, actor.household_id, pet_id).await?;
    let mut model: pet::ActiveModel = existing.into();

    if let Some(name) = update.name {
        model.name = Set(required_text("Pet name", &name)?);
    }
    if let Some(species) = update.species {
        model.species = Set(required_text("Species", &species)?);
    }
    if update.breed.is_some() {
        model.breed = Set(optional_text(update.breed));
    }
    if update.sex.is_some() {
        model.sex = Set(optional_text(update.sex));
    }
    if let Some(date_of_birth) = update.date_of_birth {
        model.date_of_birth = Set(Some(start_of_day(date_of_birth)));
    }
    if let Some(weight_kg) = update.weight_kg {
        model.weight_kg = Set(Some(positive_amount(weight_kg)?));
    }
    if update.microchip_id.is_some() {
        model.microchip_id = Set(optional_text(update.microchip_id));
    }
    if update.notes.is_some() {
        model.notes = Set(optional_text(update.notes));
    }
    model.updated_at = Set(Utc::now());

    model.update(db).await.map_err(Into::into)
}

/// Deletes a pet and, through the foreign keys, everything recorded for it.
#[instrument(skip(db, actor, storage))]
pub async fn delete_pet(
    db: &DatabaseConnection,
    storage: &dyn AvatarStorage,
    actor: &Membership,
    pet_id: i64,
) -> Result<()> {
    actor.require(Role::Member)?;
    let pet = pet_in_household(db, actor.household_id, pet_id).await?;
    let avatar = pet.avatar_url.clone();
    pet.delete(db).await?;

    if let Some(url) = avatar {
        remove_stored_avatar(storage, &url).await;
    }
    info!(pet_id, household_id = actor.household_id, "Pet deleted");
    Ok(())
}

/// Best-effort removal of a previously uploaded avatar object.
async fn remove_stored_avatar(storage: &dyn AvatarStorage, url: &str) {
    let Some(path) = storage.path_from_url(url) else {
        return;
    };
    if let Err(e) = storage.remove(&path).await {
        warn!(%path, error = %e, "Failed to remove old avatar");
    }
}

/// Uploads a new avatar for a pet, replacing any previous one. Requires member.
#[instrument(skip(db, storage, actor, bytes), fields(size = bytes.len()))]
pub async fn upload_avatar(
    db: &DatabaseConnection,
    storage: &dyn AvatarStorage,
    actor: &Membership,
    pet_id: i64,
    bytes: Vec<u8>,
    mime_type: &str,
) -> Result<pet::Model> {
    actor.require(Role::Member)?;
    let existing = pet_in_household(db, actor.household_id, pet_id).await?;
    let url = storage::upload_avatar(storage, actor.household_id, pet_id, bytes, mime_type).await?;

    let previous = existing.avatar_url.clone();
    let mut model: pet::ActiveModel = existing.into();
    model.avatar_url = Set(Some(url));
    model.updated_at = Set(Utc::now());
    let updated = model.update(db).await?;

    if let Some(old) = previous {
        remove_stored_avatar(storage, &old).await;
    }
    info!(pet_id, "Pet avatar uploaded");
    Ok(updated)
}

/// Deletes a pet's avatar object and clears its URL. Requires member.
#[instrument(skip(db, storage, actor))]
pub async fn remove_avatar(
    db: &DatabaseConnection,
    storage: &dyn AvatarStorage,
    actor: &Membership,
    pet_id: i64,
) -> Result<pet::Model> {
    actor.require(Role::Member)?;
    let existing = pet_in_household(db, actor.household_id, pet_id).await?;
    let Some(url) = existing.avatar_url.clone() else {
        return Ok(existing);
    };

    if let Some(path) = storage.path_from_url(&url) {
        storage.remove(&path).await?;
    }
    let mut model: pet::ActiveModel = existing.into();
    model.avatar_url = Set(None);
    model.updated_at = Set(Utc::now());
    model.update(db).await.map_err(Into::into)
}
