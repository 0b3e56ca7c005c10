//! `health.*` procedures: health records and medications.

use crate::{
    api::{
        AppState, ok,
        extract::{ById, HouseholdMember, Input, Patch, PetFilter},
    },
    core::health::{self, HealthRecordUpdate, MedicationUpdate, NewHealthRecord, NewMedication},
    entities::{health_record, medication},
    errors::Result,
};
use axum::{Json, Router, extract::State, routing::post};
use serde_json::Value;

/// Routes for health records and medications.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rpc/health.listRecords", post(list_records))
        .route("/rpc/health.createRecord", post(create_record))
        .route("/rpc/health.updateRecord", post(update_record))
        .route("/rpc/health.deleteRecord", post(delete_record))
        .route("/rpc/health.listMedications", post(list_medications))
        .route("/rpc/health.createMedication", post(create_medication))
        .route("/rpc/health.updateMedication", post(update_medication))
        .route("/rpc/health.deleteMedication", post(delete_medication))
}

async fn list_records(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(filter): Input<PetFilter>,
) -> Result<Json<Vec<health_record::Model>>> {
    health::list_records(&state.db, &actor, filter.pet_id)
        .await
        .map(Json)
}

async fn create_record(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(input): Input<NewHealthRecord>,
) -> Result<Json<health_record::Model>> {
    health::create_record(&state.db, &actor, input)
        .await
        .map(Json)
}

async fn update_record(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(patch): Input<Patch<HealthRecordUpdate>>,
) -> Result<Json<health_record::Model>> {
    health::update_record(&state.db, &actor, patch.id, patch.changes)
        .await
        .map(Json)
}

async fn delete_record(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(input): Input<ById>,
) -> Result<Json<Value>> {
    health::delete_record(&state.db, &actor, input.id).await?;
    Ok(ok())
}

async fn list_medications(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(filter): Input<PetFilter>,
) -> Result<Json<Vec<medication::Model>>> {
    health::list_medications(&state.db, &actor, filter.pet_id)
        .await
        .map(Json)
}

async fn create_medication(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(input): Input<NewMedication>,
) -> Result<Json<medication::Model>> {
    health::create_medication(&state.db, &actor, input)
        .await
        .map(Json)
}

async fn update_medication(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(patch): Input<Patch<MedicationUpdate>>,
) -> Result<Json<medication::Model>> {
    health::update_medication(&state.db, &actor, patch.id, patch.changes)
        .await
        .map(Json)
}

async fn delete_medication(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(input): Input<ById>,
) -> Result<Json<Value>> {
    health::delete_medication(&state.db, &actor, input.id).await?;
    Ok(ok())
}
