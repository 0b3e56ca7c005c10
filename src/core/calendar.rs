//! Calendar aggregation.
//!
//! The calendar merges five event sources into one view:
//!
//! * scheduled activities
//! * feeding schedules, materialised once per active schedule per day
//! * health records
//! * pet birthdays
//! * a fixed list of holidays, shared by every household
//!
//! Events carry a display timestamp (`YYYY-MM-DDTHH:MM:SS`, UTC) and are ordered by
//! comparing it as a string, so all-day entries at `00:00:00` sort first within a day.
//! Feeding completion is looked up in the feeding log on every call.

use crate::{
    core::{
        dates::{Month, date_key},
        feeding::{active_schedules, logged_slots},
        membership::Membership,
    },
    entities::{Activity, HealthRecord, Pet, activity, feeding_schedule, health_record, pet},
    errors::Result,
    models::HealthRecordType,
};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sea_orm::{QueryOrder, prelude::*};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Default size of the upcoming list.
pub const DEFAULT_UPCOMING_LIMIT: u64 = 10;
const MAX_UPCOMING_LIMIT: u64 = 100;
const BIRTHDAY_WINDOW_DAYS: i64 = 30;
const HOLIDAY_WINDOW_DAYS: i64 = 7;

/// Fixed holidays as (month, day, name).
pub const HOLIDAYS: &[(u32, u32, &str)] = &[
    (1, 1, "New Year's Day"),
    (2, 14, "Valentine's Day"),
    (3, 17, "St. Patrick's Day"),
    (4, 1, "April Fools' Day"),
    (4, 11, "National Pet Day"),
    (4, 22, "Earth Day"),
    (7, 4, "Independence Day"),
    (8, 26, "National Dog Day"),
    (10, 29, "National Cat Day"),
    (10, 31, "Halloween"),
    (11, 11, "Veterans Day"),
    (12, 24, "Christmas Eve"),
    (12, 25, "Christmas Day"),
    (12, 31, "New Year's Eve"),
];

/// Event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Scheduled activity
    Activity,
    /// Feeding slot
    Feeding,
    /// Health record
    Health,
    /// Pet birthday
    Birthday,
    /// Holiday
    Holiday,
}

/// One calendar entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEvent {
    /// Stable id, e.g. `activity-12` or `feeding-3-2024-06-15`
    pub id: String,
    /// Source
    pub kind: EventKind,
    /// Display title
    pub title: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `YYYY-MM-DDTHH:MM:SS`, used for ordering
    pub timestamp: String,
    /// Pet the event is about
    pub pet_id: Option<i64>,
    /// Name of that pet
    pub pet_name: Option<String>,
    /// Whether the event is done
    pub completed: bool,
}

/// Result of [`upcoming`].
#[derive(Debug, Clone, Serialize)]
pub struct Upcoming {
    /// The first `limit` events, chronologically
    pub events: Vec<CalendarEvent>,
    /// Number of events before truncation
    pub total: usize,
}

/// English ordinal suffix: 1st, 2nd, 3rd, 4th, 11th, 12th, 13th, 21st, ...
#[must_use]
pub fn ordinal_suffix(n: i32) -> &'static str {
    let n = n.unsigned_abs();
    if (11..=13).contains(&(n % 100)) {
        return "th";
    }
    match n % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// The day `date_of_birth` is celebrated in `year`. 29 February falls back to
/// 28 February in non-leap years.
#[must_use]
pub fn birthday_in_year(date_of_birth: NaiveDate, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, date_of_birth.month(), date_of_birth.day()).or_else(|| {
        (date_of_birth.month() == 2 && date_of_birth.day() == 29)
            .then(|| NaiveDate::from_ymd_opt(year, 2, 28))
            .flatten()
    })
}

/// First occurrence of a yearly date on or after `today`.
fn next_occurrence(today: NaiveDate, occurrence_in: impl Fn(i32) -> Option<NaiveDate>) -> Option<NaiveDate> {
    match occurrence_in(today.year()) {
        Some(date) if date >= today => Some(date),
        _ => occurrence_in(today.year() + 1),
    }
}

fn display_timestamp(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S").to_string()
}

fn all_day(date: NaiveDate) -> String {
    format!("{}T00:00:00", date_key(date))
}

/// Data loaded for one household, shared by the month and upcoming views.
#[derive(Debug, Default)]
struct Sources {
    pets: HashMap<i64, pet::Model>,
    activities: Vec<activity::Model>,
    schedules: Vec<feeding_schedule::Model>,
    logged: HashSet<(i64, NaiveDate)>,
    records: Vec<health_record::Model>,
}

impl Sources {
    fn pet_name(&self, pet_id: i64) -> Option<String> {
        self.pets.get(&pet_id).map(|p| p.name.clone())
    }

    fn activity_event(&self, activity: &activity::Model, at: DateTime<Utc>) -> CalendarEvent {
        CalendarEvent {
            id: format!("activity-{}", activity.id),
            kind: EventKind::Activity,
            title: activity.title.clone(),
            date: date_key(at.date_naive()),
            timestamp: display_timestamp(at),
            pet_id: Some(activity.pet_id),
            pet_name: self.pet_name(activity.pet_id),
            completed: activity.completed_at.is_some(),
        }
    }

    fn feeding_event(&self, schedule: &feeding_schedule::Model, date: NaiveDate) -> CalendarEvent {
        let key = date_key(date);
        let pet_name = self.pet_name(schedule.pet_id);
        let title = match &pet_name {
            Some(name) => format!("{} ({name})", schedule.label),
            None => schedule.label.clone(),
        };
        CalendarEvent {
            id: format!("feeding-{}-{key}", schedule.id),
            kind: EventKind::Feeding,
            title,
            timestamp: format!("{key}T{}:00", schedule.time_of_day),
            date: key,
            pet_id: Some(schedule.pet_id),
            pet_name,
            completed: self.logged.contains(&(schedule.id, date)),
        }
    }

    fn health_event(&self, record: &health_record::Model) -> CalendarEvent {
        let record_type = record.record_type.parse::<HealthRecordType>().ok();
        let vaccine = record
            .vaccine_name
            .clone()
            .filter(|_| record_type == Some(HealthRecordType::Vaccination));
        let title = vaccine
            .or_else(|| record.reason.clone())
            .unwrap_or_else(|| {
                record_type.map_or_else(
                    || record.record_type.clone(),
                    |t| t.display_name().to_string(),
                )
            });
        CalendarEvent {
            id: format!("health-{}", record.id),
            kind: EventKind::Health,
            title,
            date: date_key(record.date.date_naive()),
            timestamp: display_timestamp(record.date),
            pet_id: Some(record.pet_id),
            pet_name: self.pet_name(record.pet_id),
            completed: false,
        }
    }

    /// Birthday event for `pet` on `date`, unless the pet would not be at least one.
    fn birthday_event(pet: &pet::Model, date_of_birth: NaiveDate, date: NaiveDate) -> Option<CalendarEvent> {
        let age = date.year() - date_of_birth.year();
        if age <= 0 {
            return None;
        }
        Some(CalendarEvent {
            id: format!("birthday-{}-{}", pet.id, date.year()),
            kind: EventKind::Birthday,
            title: format!("{}'s {age}{} birthday", pet.name, ordinal_suffix(age)),
            date: date_key(date),
            timestamp: all_day(date),
            pet_id: Some(pet.id),
            pet_name: Some(pet.name.clone()),
            completed: false,
        })
    }

    fn sorted_pets(&self) -> Vec<&pet::Model> {
        let mut pets: Vec<&pet::Model> = self.pets.values().collect();
        pets.sort_by_key(|p| p.id);
        pets
    }
}

fn holiday_event(name: &str, date: NaiveDate) -> CalendarEvent {
    CalendarEvent {
        id: format!("holiday-{}", date_key(date)),
        kind: EventKind::Holiday,
        title: name.to_string(),
        date: date_key(date),
        timestamp: all_day(date),
        pet_id: None,
        pet_name: None,
        completed: false,
    }
}

/// Merges the loaded sources into per-day lists for `month`.
fn assemble_month(month: Month, sources: &Sources) -> BTreeMap<String, Vec<CalendarEvent>> {
    let mut events: Vec<CalendarEvent> = Vec::new();

    for activity in &sources.activities {
        if let Some(at) = activity.scheduled_at.filter(|at| month.contains(at.date_naive())) {
            events.push(sources.activity_event(activity, at));
        }
    }
    for schedule in sources.schedules.iter().filter(|s| s.is_active) {
        for day in month.days() {
            events.push(sources.feeding_event(schedule, day));
        }
    }
    for record in &sources.records {
        if month.contains(record.date.date_naive()) {
            events.push(sources.health_event(record));
        }
    }
    for pet in sources.sorted_pets() {
        let Some(date_of_birth) = pet.date_of_birth.map(|dob| dob.date_naive()) else {
            continue;
        };
        let Some(date) = birthday_in_year(date_of_birth, month.year()) else {
            continue;
        };
        if month.contains(date) {
            events.extend(Sources::birthday_event(pet, date_of_birth, date));
        }
    }
    for &(m, d, name) in HOLIDAYS {
        if m != month.month() {
            continue;
        }
        if let Some(date) = NaiveDate::from_ymd_opt(month.year(), m, d) {
            events.push(holiday_event(name, date));
        }
    }

    let mut by_day: BTreeMap<String, Vec<CalendarEvent>> = BTreeMap::new();
    for event in events {
        by_day.entry(event.date.clone()).or_default().push(event);
    }
    for day in by_day.values_mut() {
        day.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    }
    by_day
}

/// Collects future events relative to `now`, chronologically.
fn assemble_upcoming(now: DateTime<Utc>, sources: &Sources) -> Vec<CalendarEvent> {
    let today = now.date_naive();
    let mut events: Vec<CalendarEvent> = Vec::new();

    for activity in &sources.activities {
        if activity.completed_at.is_some() {
            continue;
        }
        if let Some(at) = activity.scheduled_at.filter(|at| *at > now) {
            events.push(sources.activity_event(activity, at));
        }
    }
    for schedule in sources.schedules.iter().filter(|s| s.is_active) {
        if !sources.logged.contains(&(schedule.id, today)) {
            events.push(sources.feeding_event(schedule, today));
        }
    }
    for record in sources.records.iter().filter(|r| r.date > now) {
        events.push(sources.health_event(record));
    }
    for pet in sources.sorted_pets() {
        let Some(date_of_birth) = pet.date_of_birth.map(|dob| dob.date_naive()) else {
            continue;
        };
        let Some(date) = next_occurrence(today, |year| birthday_in_year(date_of_birth, year)) else {
            continue;
        };
        if (date - today).num_days() <= BIRTHDAY_WINDOW_DAYS {
            events.extend(Sources::birthday_event(pet, date_of_birth, date));
        }
    }
    for &(m, d, name) in HOLIDAYS {
        let Some(date) = next_occurrence(today, |year| NaiveDate::from_ymd_opt(year, m, d)) else {
            continue;
        };
        if (date - today).num_days() <= HOLIDAY_WINDOW_DAYS {
            events.push(holiday_event(name, date));
        }
    }

    events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    events
}

async fn load_pets(db: &DatabaseConnection, household_id: i64) -> Result<HashMap<i64, pet::Model>> {
    Ok(Pet::find()
        .filter(pet::Column::HouseholdId.eq(household_id))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect())
}

/// Calendar events of `month`, grouped by `YYYY-MM-DD`.
///
/// # Arguments
/// * `db` - Database connection
/// * `actor` - Any member of the household
/// * `month` - Month to show
///
/// # Returns
/// A map from date key to that day's events in display order. Days without events
/// are absent.
pub async fn month_events(
    db: &DatabaseConnection,
    actor: &Membership,
    month: Month,
) -> Result<BTreeMap<String, Vec<CalendarEvent>>> {
    let household_id = actor.household_id;
    debug!(household_id, %month, "Building calendar month");

    let (from, to) = (month.start_utc(), month.end_utc());
    let last_day = month.next().first_day().pred_opt().unwrap_or(month.first_day());
    let sources = Sources {
        pets: load_pets(db, household_id).await?,
        activities: Activity::find()
            .filter(activity::Column::HouseholdId.eq(household_id))
            .filter(activity::Column::ScheduledAt.gte(from))
            .filter(activity::Column::ScheduledAt.lt(to))
            .order_by_asc(activity::Column::ScheduledAt)
            .all(db)
            .await?,
        schedules: active_schedules(db, household_id).await?,
        logged: logged_slots(db, household_id, month.first_day(), last_day).await?,
        records: HealthRecord::find()
            .filter(health_record::Column::HouseholdId.eq(household_id))
            .filter(health_record::Column::Date.gte(from))
            .filter(health_record::Column::Date.lt(to))
            .order_by_asc(health_record::Column::Date)
            .all(db)
            .await?,
    };

    Ok(assemble_month(month, &sources))
}

/// Upcoming events after `now`.
///
/// Includes open activities scheduled after `now`, health records dated after `now`,
/// today's feedings not logged yet, birthdays within 30 days and holidays within 7
/// days. `limit` defaults to 10 and is clamped to 1..=100.
pub async fn upcoming(
    db: &DatabaseConnection,
    actor: &Membership,
    limit: Option<u64>,
    now: DateTime<Utc>,
) -> Result<Upcoming> {
    let household_id = actor.household_id;
    let limit = limit
        .unwrap_or(DEFAULT_UPCOMING_LIMIT)
        .clamp(1, MAX_UPCOMING_LIMIT);
    let today = now.date_naive();

    let sources = Sources {
        pets: load_pets(db, household_id).await?,
        activities: Activity::find()
            .filter(activity::Column::HouseholdId.eq(household_id))
            .filter(activity::Column::ScheduledAt.gt(now))
            .filter(activity::Column::CompletedAt.is_null())
            .order_by_asc(activity::Column::ScheduledAt)
            .all(db)
            .await?,
        schedules: active_schedules(db, household_id).await?,
        logged: logged_slots(db, household_id, today, today).await?,
        records: HealthRecord::find()
            .filter(health_record::Column::HouseholdId.eq(household_id))
            .filter(health_record::Column::Date.gt(now))
            .order_by_asc(health_record::Column::Date)
            .all(db)
            .await?,
    };

    let mut events = assemble_upcoming(now, &sources);
    let total = events.len();
    events.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
    debug!(household_id, total, returned = events.len(), "Built upcoming events");
    Ok(Upcoming { events, total })
}
