//! Health records and medications.
//!
//! Vaccine names and next-due dates only make sense for vaccinations; for every
//! other record type they are dropped on write.

use crate::{
    core::{
        membership::{Membership, pet_in_household},
        validation::{optional_cost, optional_text, required_text},
    },
    entities::{HealthRecord, Medication, health_record, medication},
    errors::{Error, Result},
    models::{HealthRecordType, Role},
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;
use tracing::{info, instrument};

/// Input for [`create_record`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewHealthRecord {
    /// Pet the record is for
    pub pet_id: i64,
    /// Record type
    pub record_type: HealthRecordType,
    /// When it happened
    pub date: DateTime<Utc>,
    /// Reason for the visit
    #[serde(default)]
    pub reason: Option<String>,
    /// Vaccine name (vaccinations only)
    #[serde(default)]
    pub vaccine_name: Option<String>,
    /// Vet or clinic
    #[serde(default)]
    pub vet_name: Option<String>,
    /// Billed cost
    #[serde(default)]
    pub cost: Option<f64>,
    /// Next due date (vaccinations only)
    #[serde(default)]
    pub next_due_date: Option<DateTime<Utc>>,
    /// Notes
    #[serde(default)]
    pub notes: Option<String>,
}

/// Changes to a health record. `None` leaves a field unchanged; an empty string
/// clears an optional text field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthRecordUpdate {
    /// New type
    pub record_type: Option<HealthRecordType>,
    /// New date
    pub date: Option<DateTime<Utc>>,
    /// New reason
    pub reason: Option<String>,
    /// New vaccine name
    pub vaccine_name: Option<String>,
    /// New vet name
    pub vet_name: Option<String>,
    /// New cost
    pub cost: Option<f64>,
    /// New next due date
    pub next_due_date: Option<DateTime<Utc>>,
    /// New notes
    pub notes: Option<String>,
}

/// Input for [`create_medication`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewMedication {
    /// Pet receiving the medication
    pub pet_id: i64,
    /// Medication name
    pub name: String,
    /// Dosage
    #[serde(default)]
    pub dosage: Option<String>,
    /// Frequency
    #[serde(default)]
    pub frequency: Option<String>,
    /// First day
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Last day
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Notes
    #[serde(default)]
    pub notes: Option<String>,
}

/// Changes to a medication.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedicationUpdate {
    /// New name
    pub name: Option<String>,
    /// New dosage
    pub dosage: Option<String>,
    /// New frequency
    pub frequency: Option<String>,
    /// New start date
    pub start_date: Option<NaiveDate>,
    /// New end date
    pub end_date: Option<NaiveDate>,
    /// Whether the course is ongoing
    pub is_active: Option<bool>,
    /// New notes
    pub notes: Option<String>,
}

fn check_course(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<()> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(Error::bad_request(
            "Medication end date is before its start date",
        )),
        _ => Ok(()),
    }
}

/// Lists health records, most recent first, optionally for one pet.
pub async fn list_records(
    db: &DatabaseConnection,
    actor: &Membership,
    pet_id: Option<i64>,
) -> Result<Vec<health_record::Model>> {
    let mut query =
        HealthRecord::find().filter(health_record::Column::HouseholdId.eq(actor.household_id));
    if let Some(pet_id) = pet_id {
        query = query.filter(health_record::Column::PetId.eq(pet_id));
    }
    query
        .order_by_desc(health_record::Column::Date)
        .order_by_desc(health_record::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn record_in_household(
    db: &DatabaseConnection,
    household_id: i64,
    record_id: i64,
) -> Result<health_record::Model> {
    HealthRecord::find_by_id(record_id)
        .filter(health_record::Column::HouseholdId.eq(household_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("HealthRecord", record_id))
}

/// Adds a health record. Requires member.
#[instrument(skip(db, actor))]
pub async fn create_record(
    db: &DatabaseConnection,
    actor: &Membership,
    input: NewHealthRecord,
) -> Result<health_record::Model> {
    actor.require(Role::Member)?;
    let cost = optional_cost(input.cost)?;
    pet_in_household(db, actor.household_id, input.pet_id).await?;
    let is_vaccination = input.record_type == HealthRecordType::Vaccination;

    let record = health_record::ActiveModel {
        household_id: Set(actor.household_id),
        pet_id: Set(input.pet_id),
        record_type: Set(input.record_type.as_str().to_string()),
        date: Set(input.date),
        reason: Set(optional_text(input.reason)),
        vaccine_name: Set(optional_text(input.vaccine_name).filter(|_| is_vaccination)),
        vet_name: Set(optional_text(input.vet_name)),
        cost: Set(cost),
        next_due_date: Set(input.next_due_date.filter(|_| is_vaccination)),
        notes: Set(optional_text(input.notes)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(record_id = record.id, record_type = %input.record_type, "Health record created");
    Ok(record)
}

/// Edits a health record. Requires member.
#[instrument(skip(db, actor))]
pub async fn update_record(
    db: &DatabaseConnection,
    actor: &Membership,
    record_id: i64,
    update: HealthRecordUpdate,
) -> Result<health_record::Model> {
    actor.require(Role::Member)?;
    let existing = record_in_household(db, actor.household_id, record_id).await?;
    let record_type = match update.record_type {
        Some(record_type) => record_type,
        None => existing.record_type.parse()?,
    };
    let is_vaccination = record_type == HealthRecordType::Vaccination;
    let mut model: health_record::ActiveModel = existing.into();

    model.record_type = Set(record_type.as_str().to_string());
    if let Some(date) = update.date {
        model.date = Set(date);
    }
    if update.reason.is_some() {
        model.reason = Set(optional_text(update.reason));
    }
    if update.vet_name.is_some() {
        model.vet_name = Set(optional_text(update.vet_name));
    }
    if update.cost.is_some() {
        model.cost = Set(optional_cost(update.cost)?);
    }
    if update.notes.is_some() {
        model.notes = Set(optional_text(update.notes));
    }
    if is_vaccination {
        if update.vaccine_name.is_some() {
            model.vaccine_name = Set(optional_text(update.vaccine_name));
        }
        if let Some(next_due_date) = update.next_due_date {
            model.next_due_date = Set(Some(next_due_date));
        }
    } else {
        model.vaccine_name = Set(None);
        model.next_due_date = Set(None);
    }

    model.update(db).await.map_err(Into::into)
}

/// Deletes a health record. Requires member.
#[instrument(skip(db, actor))]
pub async fn delete_record(db: &DatabaseConnection, actor: &Membership, record_id: i64) -> Result<()> {
    actor.require(Role::Member)?;
    let existing = record_in_household(db, actor.household_id, record_id).await?;
    existing.delete(db).await?;
    info!(record_id, "Health record deleted");
    Ok(())
}

/// Lists medications, active ones first, optionally for one pet.
pub async fn list_medications(
    db: &DatabaseConnection,
    actor: &Membership,
    pet_id: Option<i64>,
) -> Result<Vec<medication::Model>> {
    let mut query = Medication::find().filter(medication::Column::HouseholdId.eq(actor.household_id));
    if let Some(pet_id) = pet_id {
        query = query.filter(medication::Column::PetId.eq(pet_id));
    }
    query
        .order_by_desc(medication::Column::IsActive)
        .order_by_asc(medication::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn medication_in_household(
    db: &DatabaseConnection,
    household_id: i64,
    medication_id: i64,
) -> Result<medication::Model> {
    Medication::find_by_id(medication_id)
        .filter(medication::Column::HouseholdId.eq(household_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Medication", medication_id))
}

/// Adds a medication course. Requires member.
#[instrument(skip(db, actor))]
pub async fn create_medication(
    db: &DatabaseConnection,
    actor: &Membership,
    input: NewMedication,
) -> Result<medication::Model> {
    actor.require(Role::Member)?;
    let name = required_text("Medication name", &input.name)?;
    check_course(input.start_date, input.end_date)?;
    pet_in_household(db, actor.household_id, input.pet_id).await?;

    let medication = medication::ActiveModel {
        household_id: Set(actor.household_id),
        pet_id: Set(input.pet_id),
        name: Set(name),
        dosage: Set(optional_text(input.dosage)),
        frequency: Set(optional_text(input.frequency)),
        start_date: Set(input.start_date),
        end_date: Set(input.end_date),
        is_active: Set(true),
        notes: Set(optional_text(input.notes)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(medication_id = medication.id, "Medication created");
    Ok(medication)
}

/// Edits a medication course. Requires member.
#[instrument(skip(db, actor))]
pub async fn update_medication(
    db: &DatabaseConnection,
    actor: &Membership,
    medication_id: i64,
    update: MedicationUpdate,
) -> Result<medication::Model> {
    actor.require(Role::Member)?;
    let existing = medication_in_household(db, actor.household_id, medication_id).await?;
    check_course(
        update.start_date.or(existing.start_date),
        update.end_date.or(existing.end_date),
    )?;
    let mut model: medication::ActiveModel = existing.into();

    if let Some(name) = update.name {
        model.name = Set(required_text("Medication name", &name)?);
    }
    if update.dosage.is_some() {
        model.dosage = Set(optional_text(update.dosage));
    }
    if update.frequency.is_some() {
        model.frequency = Set(optional_text(update.frequency));
    }
    if let Some(start_date) = update.start_date {
        model.start_date = Set(Some(start_date));
    }
    if let Some(end_date) = update.end_date {
        model.end_date = Set(Some(end_date));
    }
    if let Some(is_active) = update.is_active {
        model.is_active = Set(is_active);
    }
    if update.notes.is_some() {
        model.notes = Set(optional_text(update.notes));
    }

    model.update(db).await.map_err(Into::into)
}

/// Deletes a medication. Requires member.
#[instrument(skip(db, actor))]
pub async fn delete_medication(
    db: &DatabaseConnection,
    actor: &Membership,
    medication_id: i64,
) -> Result<()> {
    actor.require(Role::Member)?;
    let existing = medication_in_household(db, actor.household_id, medication_id).await?;
    existing.delete(db).await?;
    info!(medication_id, "Medication deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use chrono::{Duration, TimeZone};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 0, 0)
            .single()
            .unwrap_or_default()
    }

    fn checkup(pet_id: i64) -> NewHealthRecord {
        NewHealthRecord {
            pet_id,
            record_type: HealthRecordType::Checkup,
            date: at(2024, 3, 4),
            reason: Some("Annual".to_string()),
            vaccine_name: Some("Rabies".to_string()),
            vet_name: None,
            cost: Some(80.0),
            next_due_date: Some(at(2025, 3, 4)),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_next_due_date_only_kept_for_vaccinations() -> Result<()> {
        let (db, _household, owner) = setup_with_household().await?;
        let pet = create_test_pet(&db, &owner, "Rex").await?;

        let record = create_record(&db, &owner, checkup(pet.id)).await?;
        assert_eq!(record.next_due_date, None);
        assert_eq!(record.vaccine_name, None);
        assert_eq!(record.cost, Some(80.0));

        let vaccination = create_record(
            &db,
            &owner,
            NewHealthRecord {
                record_type: HealthRecordType::Vaccination,
                ..checkup(pet.id)
            },
        )
        .await?;
        assert_eq!(vaccination.next_due_date, Some(at(2025, 3, 4)));
        assert_eq!(vaccination.vaccine_name.as_deref(), Some("Rabies"));

        // Switching the type away from vaccination drops the vaccination fields
        let switched = update_record(
            &db,
            &owner,
            vaccination.id,
            HealthRecordUpdate {
                record_type: Some(HealthRecordType::VetVisit),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(switched.record_type, "vet_visit");
        assert_eq!(switched.next_due_date, None);
        assert_eq!(switched.vaccine_name, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_record_validation_and_access() -> Result<()> {
        let (db, household, owner) = setup_with_household().await?;
        let pet = create_test_pet(&db, &owner, "Rex").await?;
        let sitter = add_member(&db, household.id, "sitter", Role::Sitter).await?;

        assert!(matches!(
            create_record(&db, &sitter, checkup(pet.id)).await,
            Err(Error::Forbidden { .. })
        ));
        assert!(matches!(
            create_record(
                &db,
                &owner,
                NewHealthRecord {
                    cost: Some(-5.0),
                    ..checkup(pet.id)
                }
            )
            .await,
            Err(Error::InvalidAmount { .. })
        ));

        let older = create_record(&db, &owner, checkup(pet.id)).await?;
        let newer = create_record(
            &db,
            &owner,
            NewHealthRecord {
                date: at(2024, 5, 1),
                ..checkup(pet.id)
            },
        )
        .await?;
        let listed = list_records(&db, &sitter, Some(pet.id)).await?;
        assert_eq!(listed.iter().map(|r| r.id).collect::<Vec<_>>(), vec![newer.id, older.id]);

        delete_record(&db, &owner, older.id).await?;
        assert_eq!(list_records(&db, &owner, None).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_medication_crud() -> Result<()> {
        let (db, _household, owner) = setup_with_household().await?;
        let pet = create_test_pet(&db, &owner, "Rex").await?;
        let today = Utc::now().date_naive();

        let backwards = create_medication(
            &db,
            &owner,
            NewMedication {
                pet_id: pet.id,
                name: "Apoquel".to_string(),
                dosage: None,
                frequency: None,
                start_date: Some(today),
                end_date: Some(today - Duration::days(1)),
                notes: None,
            },
        )
        .await;
        assert!(matches!(backwards, Err(Error::BadRequest { .. })));

        let medication = create_medication(
            &db,
            &owner,
            NewMedication {
                pet_id: pet.id,
                name: "Apoquel".to_string(),
                dosage: Some("16mg".to_string()),
                frequency: Some("daily".to_string()),
                start_date: Some(today),
                end_date: None,
                notes: None,
            },
        )
        .await?;
        assert!(medication.is_active);

        let stopped = update_medication(
            &db,
            &owner,
            medication.id,
            MedicationUpdate {
                is_active: Some(false),
                end_date: Some(today + Duration::days(10)),
                dosage: Some(String::new()),
                ..Default::default()
            },
        )
        .await?;
        assert!(!stopped.is_active);
        assert_eq!(stopped.dosage, None);

        delete_medication(&db, &owner, medication.id).await?;
        assert!(list_medications(&db, &owner, None).await?.is_empty());
        Ok(())
    }
}
