//! Feeding schedules and their per-day completion logs.
//!
//! A schedule is a recurring daily slot. Whether a slot is done on a given date is
//! the existence of a log row for (schedule, date); nothing else records it.

use crate::{
    core::{
        membership::{Membership, pet_in_household},
        validation::{optional_text, required_text},
    },
    entities::{FeedingLog, FeedingSchedule, Pet, feeding_log, feeding_schedule, pet},
    errors::{Error, Result},
    models::Role,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use sea_orm::{QueryOrder, Set, SqlErr, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument};

/// Input for [`create_schedule`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewSchedule {
    /// Pet to feed
    pub pet_id: i64,
    /// Slot label (e.g., "Breakfast")
    pub label: String,
    /// `HH:MM`
    pub time_of_day: String,
    /// Food to serve
    #[serde(default)]
    pub food_type: Option<String>,
    /// Portion
    #[serde(default)]
    pub amount: Option<String>,
}

/// Changes to a schedule.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleUpdate {
    /// New label
    pub label: Option<String>,
    /// New time of day
    pub time_of_day: Option<String>,
    /// New food type; empty string clears
    pub food_type: Option<String>,
    /// New portion; empty string clears
    pub amount: Option<String>,
    /// Pause or resume the schedule
    pub is_active: Option<bool>,
}

/// One slot of the feeding status board.
#[derive(Debug, Clone, Serialize)]
pub struct FeedingStatus {
    /// The schedule
    pub schedule: feeding_schedule::Model,
    /// Name of the pet being fed
    pub pet_name: String,
    /// Whether the slot is done for the date
    pub done: bool,
    /// The completion log, when done
    pub log: Option<feeding_log::Model>,
}

/// Normalises a `HH:MM` (or `H:MM`) time to `HH:MM`.
pub fn parse_time_of_day(value: &str) -> Result<String> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map(|time| time.format("%H:%M").to_string())
        .map_err(|_| Error::bad_request(format!("Time must be formatted HH:MM, got {value:?}")))
}

/// Lists schedules by time of day, optionally for one pet.
pub async fn list_schedules(
    db: &DatabaseConnection,
    actor: &Membership,
    pet_id: Option<i64>,
) -> Result<Vec<feeding_schedule::Model>> {
    let mut query =
        FeedingSchedule::find().filter(feeding_schedule::Column::HouseholdId.eq(actor.household_id));
    if let Some(pet_id) = pet_id {
        query = query.filter(feeding_schedule::Column::PetId.eq(pet_id));
    }
    query
        .order_by_asc(feeding_schedule::Column::TimeOfDay)
        .order_by_asc(feeding_schedule::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Active schedules of a household, by time of day.
pub async fn active_schedules<C>(db: &C, household_id: i64) -> Result<Vec<feeding_schedule::Model>>
where
    C: ConnectionTrait,
{
    FeedingSchedule::find()
        .filter(feeding_schedule::Column::HouseholdId.eq(household_id))
        .filter(feeding_schedule::Column::IsActive.eq(true))
        .order_by_asc(feeding_schedule::Column::TimeOfDay)
        .order_by_asc(feeding_schedule::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The (schedule, date) pairs logged between `from` and `to`, both inclusive.
pub async fn logged_slots<C>(
    db: &C,
    household_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<HashSet<(i64, NaiveDate)>>
where
    C: ConnectionTrait,
{
    let logs = FeedingLog::find()
        .filter(feeding_log::Column::HouseholdId.eq(household_id))
        .filter(feeding_log::Column::Date.between(from, to))
        .all(db)
        .await?;
    Ok(logs.into_iter().map(|log| (log.schedule_id, log.date)).collect())
}

async fn schedule_in_household(
    db: &DatabaseConnection,
    household_id: i64,
    schedule_id: i64,
) -> Result<feeding_schedule::Model> {
    FeedingSchedule::find_by_id(schedule_id)
        .filter(feeding_schedule::Column::HouseholdId.eq(household_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("FeedingSchedule", schedule_id))
}

/// Adds a feeding slot. Requires member.
#[instrument(skip(db, actor))]
pub async fn create_schedule(
    db: &DatabaseConnection,
    actor: &Membership,
    input: NewSchedule,
) -> Result<feeding_schedule::Model> {
    actor.require(Role::Member)?;
    let label = required_text("Label", &input.label)?;
    let time_of_day = parse_time_of_day(&input.time_of_day)?;
    pet_in_household(db, actor.household_id, input.pet_id).await?;

    let schedule = feeding_schedule::ActiveModel {
        household_id: Set(actor.household_id),
        pet_id: Set(input.pet_id),
        label: Set(label),
        time_of_day: Set(time_of_day),
        food_type: Set(optional_text(input.food_type)),
        amount: Set(optional_text(input.amount)),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(schedule_id = schedule.id, pet_id = schedule.pet_id, "Feeding schedule created");
    Ok(schedule)
}

/// Edits a feeding slot. Requires member.
#[instrument(skip(db, actor))]
pub async fn update_schedule(
    db: &DatabaseConnection,
    actor: &Membership,
    schedule_id: i64,
    update: ScheduleUpdate,
) -> Result<feeding_schedule::Model> {
    actor.require(Role::Member)?;
    let existing = schedule_in_household(db, actor.household_id, schedule_id).await?;
    let mut model: feeding_schedule::ActiveModel = existing.into();

    if let Some(label) = update.label {
        model.label = Set(required_text("Label", &label)?);
    }
    if let Some(time_of_day) = update.time_of_day {
        model.time_of_day = Set(parse_time_of_day(&time_of_day)?);
    }
    if update.food_type.is_some() {
        model.food_type = Set(optional_text(update.food_type));
    }
    if update.amount.is_some() {
        model.amount = Set(optional_text(update.amount));
    }
    if let Some(is_active) = update.is_active {
        model.is_active = Set(is_active);
    }

    model.update(db).await.map_err(Into::into)
}

/// Deletes a feeding slot and its logs. Requires member.
#[instrument(skip(db, actor))]
pub async fn delete_schedule(db: &DatabaseConnection, actor: &Membership, schedule_id: i64) -> Result<()> {
    actor.require(Role::Member)?;
    let existing = schedule_in_household(db, actor.household_id, schedule_id).await?;
    existing.delete(db).await?;
    info!(schedule_id, "Feeding schedule deleted");
    Ok(())
}

/// Active schedules with their done flag for `date`.
pub async fn status_for_household(
    db: &DatabaseConnection,
    household_id: i64,
    date: NaiveDate,
) -> Result<Vec<FeedingStatus>> {
    debug!(household_id, %date, "Computing feeding status");
    let schedules = active_schedules(db, household_id).await?;
    let pets: HashMap<i64, String> = Pet::find()
        .filter(pet::Column::HouseholdId.eq(household_id))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();
    let mut logs: HashMap<i64, feeding_log::Model> = FeedingLog::find()
        .filter(feeding_log::Column::HouseholdId.eq(household_id))
        .filter(feeding_log::Column::Date.eq(date))
        .all(db)
        .await?
        .into_iter()
        .map(|log| (log.schedule_id, log))
        .collect();

    Ok(schedules
        .into_iter()
        .map(|schedule| {
            let log = logs.remove(&schedule.id);
            FeedingStatus {
                pet_name: pets.get(&schedule.pet_id).cloned().unwrap_or_default(),
                done: log.is_some(),
                log,
                schedule,
            }
        })
        .collect())
}

/// Feeding status board for `date` (default today, UTC).
pub async fn feeding_status(
    db: &DatabaseConnection,
    actor: &Membership,
    date: Option<NaiveDate>,
) -> Result<Vec<FeedingStatus>> {
    let date = date.unwrap_or_else(|| Utc::now().date_naive());
    status_for_household(db, actor.household_id, date).await
}

async fn find_log(
    db: &DatabaseConnection,
    schedule_id: i64,
    date: NaiveDate,
) -> Result<Option<feeding_log::Model>> {
    FeedingLog::find()
        .filter(feeding_log::Column::ScheduleId.eq(schedule_id))
        .filter(feeding_log::Column::Date.eq(date))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Marks a slot done for `date`. Logging an already logged slot returns the
/// existing log. Open to every role.
#[instrument(skip(db, actor))]
pub async fn log_completion(
    db: &DatabaseConnection,
    actor: &Membership,
    schedule_id: i64,
    date: Option<NaiveDate>,
    notes: Option<String>,
) -> Result<feeding_log::Model> {
    let schedule = schedule_in_household(db, actor.household_id, schedule_id).await?;
    let date = date.unwrap_or_else(|| Utc::now().date_naive());

    if let Some(existing) = find_log(db, schedule.id, date).await? {
        return Ok(existing);
    }

    let inserted = feeding_log::ActiveModel {
        household_id: Set(actor.household_id),
        schedule_id: Set(schedule.id),
        date: Set(date),
        member_id: Set(Some(actor.member_id())),
        fed_at: Set(Utc::now()),
        notes: Set(optional_text(notes)),
        ..Default::default()
    }
    .insert(db)
    .await;

    match inserted {
        Ok(log) => {
            info!(schedule_id, %date, "Feeding logged");
            Ok(log)
        }
        // Lost a race against a concurrent log of the same slot
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            find_log(db, schedule.id, date)
                .await?
                .ok_or_else(|| Error::not_found("FeedingLog", schedule_id))
        }
        Err(e) => Err(e.into()),
    }
}

/// Clears the done flag of a slot for `date`. Open to every role.
#[instrument(skip(db, actor))]
pub async fn undo_completion(
    db: &DatabaseConnection,
    actor: &Membership,
    schedule_id: i64,
    date: Option<NaiveDate>,
) -> Result<()> {
    let schedule = schedule_in_household(db, actor.household_id, schedule_id).await?;
    let date = date.unwrap_or_else(|| Utc::now().date_naive());
    let removed = FeedingLog::delete_many()
        .filter(feeding_log::Column::ScheduleId.eq(schedule.id))
        .filter(feeding_log::Column::Date.eq(date))
        .exec(db)
        .await?;
    info!(schedule_id, %date, removed = removed.rows_affected, "Feeding log removed");
    Ok(())
}
