//! Finance aggregation over expenses and billable health records.
//!
//! Two cost sources feed every figure here: expense rows, and health records with a
//! positive cost. Both are categorised by display name (`"Food"`, `"Vet Visit"`), so a
//! vet expense and a billed vet visit land on the same category line.

use crate::{
    core::{dates::Month, expense::expenses_between, membership::Membership},
    entities::{HealthRecord, Pet, expense, health_record, pet},
    errors::{Error, Result},
    models::{ExpenseCategory, HealthRecordType},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, prelude::*};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Trailing months returned by [`monthly_trend`] by default.
pub const DEFAULT_TREND_MONTHS: u32 = 6;
const MAX_TREND_MONTHS: u32 = 24;
const RECENT_ENTRIES: usize = 5;

/// Where a finance entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    /// An expense row
    Expense,
    /// A health record with a cost
    HealthRecord,
}

/// One cost, from either source.
#[derive(Debug, Clone, Serialize)]
pub struct FinanceEntry {
    /// `expense-{id}` or `health-{id}`
    pub id: String,
    /// Source table
    pub source: EntrySource,
    /// Pet the cost belongs to
    pub pet_id: i64,
    /// Pet name, empty if the pet is gone
    pub pet_name: String,
    /// Category name used in the breakdown
    pub category: String,
    /// Amount
    pub amount: f64,
    /// Description or reason
    pub description: Option<String>,
    /// When the cost was incurred
    pub date: DateTime<Utc>,
}

/// Total for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    /// Category name
    pub category: String,
    /// Sum of amounts
    pub total: f64,
}

/// Total for one pet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PetTotal {
    /// Pet id
    pub pet_id: i64,
    /// Pet name
    pub pet_name: String,
    /// Sum of amounts
    pub total: f64,
}

/// Monthly finance summary.
#[derive(Debug, Clone, Serialize)]
pub struct FinanceSummary {
    /// Month summarised
    pub month: Month,
    /// Total for the month
    pub monthly_total: f64,
    /// Total for the month before
    pub previous_month_total: f64,
    /// Month-over-month change in percent
    pub percent_change: f64,
    /// Totals per category, largest first
    pub by_category: Vec<CategoryTotal>,
    /// Totals per pet, largest first
    pub by_pet: Vec<PetTotal>,
    /// Most recent entries, newest first
    pub recent: Vec<FinanceEntry>,
}

/// One point of the spending trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    /// Month
    pub month: Month,
    /// Total spent
    pub total: f64,
}

/// Month-over-month change in percent.
///
/// A zero previous total is reported as +100% when the current total is positive,
/// and as 0% when both totals are zero.
///
/// # Arguments
/// * `current` - Total for the month being summarised
/// * `previous` - Total for the month before
#[must_use]
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous.abs() < f64::EPSILON {
        return if current > 0.0 { 100.0 } else { 0.0 };
    }
    (current - previous) / previous * 100.0
}

fn expense_entry(expense: expense::Model, pets: &HashMap<i64, String>) -> Result<FinanceEntry> {
    let category: ExpenseCategory = expense.category.parse()?;
    Ok(FinanceEntry {
        id: format!("expense-{}", expense.id),
        source: EntrySource::Expense,
        pet_id: expense.pet_id,
        pet_name: pets.get(&expense.pet_id).cloned().unwrap_or_default(),
        category: category.display_name().to_string(),
        amount: expense.amount,
        description: expense.description,
        date: expense.date,
    })
}

fn health_entry(record: health_record::Model, pets: &HashMap<i64, String>) -> Result<FinanceEntry> {
    let record_type: HealthRecordType = record.record_type.parse()?;
    Ok(FinanceEntry {
        id: format!("health-{}", record.id),
        source: EntrySource::HealthRecord,
        pet_id: record.pet_id,
        pet_name: pets.get(&record.pet_id).cloned().unwrap_or_default(),
        category: record_type.display_name().to_string(),
        amount: record.cost.unwrap_or_default(),
        description: record.reason,
        date: record.date,
    })
}

async fn pet_names(db: &DatabaseConnection, household_id: i64) -> Result<HashMap<i64, String>> {
    Ok(Pet::find()
        .filter(pet::Column::HouseholdId.eq(household_id))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect())
}

/// Every cost of a household dated within `[from, to)`, newest first.
async fn entries_between(
    db: &DatabaseConnection,
    household_id: i64,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    pets: &HashMap<i64, String>,
) -> Result<Vec<FinanceEntry>> {
    let expenses = expenses_between(db, household_id, from, to).await?;
    let records = HealthRecord::find()
        .filter(health_record::Column::HouseholdId.eq(household_id))
        .filter(health_record::Column::Cost.gt(0.0))
        .filter(health_record::Column::Date.gte(from))
        .filter(health_record::Column::Date.lt(to))
        .order_by_desc(health_record::Column::Date)
        .all(db)
        .await?;

    let mut entries: Vec<FinanceEntry> = expenses
        .into_iter()
        .map(|expense| expense_entry(expense, pets))
        .collect::<Result<_>>()?;
    for record in records {
        entries.push(health_entry(record, pets)?);
    }
    entries.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(entries)
}

fn total(entries: &[FinanceEntry]) -> f64 {
    entries.iter().map(|e| e.amount).sum()
}

fn descending(a: f64, b: f64) -> std::cmp::Ordering {
    b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
}

/// Builds a summary from a month's entries (newest first) and the previous total.
#[must_use]
pub fn summarize(month: Month, entries: Vec<FinanceEntry>, previous_month_total: f64) -> FinanceSummary {
    let monthly_total = total(&entries);

    let mut categories: HashMap<String, f64> = HashMap::new();
    let mut pets: HashMap<i64, (String, f64)> = HashMap::new();
    for entry in &entries {
        *categories.entry(entry.category.clone()).or_default() += entry.amount;
        pets.entry(entry.pet_id)
            .or_insert_with(|| (entry.pet_name.clone(), 0.0))
            .1 += entry.amount;
    }

    let mut by_category: Vec<CategoryTotal> = categories
        .into_iter()
        .map(|(category, total)| CategoryTotal { category, total })
        .collect();
    by_category.sort_by(|a, b| descending(a.total, b.total).then_with(|| a.category.cmp(&b.category)));

    let mut by_pet: Vec<PetTotal> = pets
        .into_iter()
        .map(|(pet_id, (pet_name, total))| PetTotal {
            pet_id,
            pet_name,
            total,
        })
        .collect();
    by_pet.sort_by(|a, b| descending(a.total, b.total).then_with(|| a.pet_id.cmp(&b.pet_id)));

    let recent = entries.into_iter().take(RECENT_ENTRIES).collect();

    FinanceSummary {
        month,
        monthly_total,
        previous_month_total,
        percent_change: percent_change(monthly_total, previous_month_total),
        by_category,
        by_pet,
        recent,
    }
}

/// Finance summary for `month`.
pub async fn finance_summary(
    db: &DatabaseConnection,
    actor: &Membership,
    month: Month,
) -> Result<FinanceSummary> {
    debug!(household_id = actor.household_id, %month, "Building finance summary");
    let pets = pet_names(db, actor.household_id).await?;
    let current =
        entries_between(db, actor.household_id, month.start_utc(), month.end_utc(), &pets).await?;
    let previous_month = month.previous();
    let previous = entries_between(
        db,
        actor.household_id,
        previous_month.start_utc(),
        previous_month.end_utc(),
        &pets,
    )
    .await?;

    Ok(summarize(month, current, total(&previous)))
}

/// Monthly totals for the `months` months ending with `end`, oldest first.
///
/// # Arguments
/// * `end` - Last month of the trend (usually the current month)
/// * `months` - How many months to return; defaults to 6, at most 24
pub async fn monthly_trend(
    db: &DatabaseConnection,
    actor: &Membership,
    end: Month,
    months: Option<u32>,
) -> Result<Vec<TrendPoint>> {
    let months = months.unwrap_or(DEFAULT_TREND_MONTHS);
    if months == 0 || months > MAX_TREND_MONTHS {
        return Err(Error::bad_request(format!(
            "months must be between 1 and {MAX_TREND_MONTHS}"
        )));
    }

    let mut first = end;
    for _ in 1..months {
        first = first.previous();
    }
    let pets = pet_names(db, actor.household_id).await?;
    let entries = entries_between(db, actor.household_id, first.start_utc(), end.end_utc(), &pets).await?;

    let mut points = Vec::new();
    let mut month = first;
    while month <= end {
        let total = entries
            .iter()
            .filter(|e| month.contains(e.date.date_naive()))
            .map(|e| e.amount)
            .sum();
        points.push(TrendPoint { month, total });
        month = month.next();
    }
    Ok(points)
}
