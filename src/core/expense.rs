//! Expense business logic.

use crate::{
    core::{
        dates::Month,
        membership::{Membership, pet_in_household},
        validation::{optional_text, positive_amount},
    },
    entities::{Expense, expense},
    errors::{Error, Result},
    models::{ExpenseCategory, Role},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;
use tracing::{info, instrument};

/// Input for [`create_expense`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewExpense {
    /// Pet the expense is for
    pub pet_id: i64,
    /// Category
    pub category: ExpenseCategory,
    /// Amount, must be positive
    pub amount: f64,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// When the expense was incurred
    pub date: DateTime<Utc>,
}

/// Changes to an expense.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseUpdate {
    /// Move the expense to another pet
    pub pet_id: Option<i64>,
    /// New category
    pub category: Option<ExpenseCategory>,
    /// New amount
    pub amount: Option<f64>,
    /// New description; empty string clears
    pub description: Option<String>,
    /// New date
    pub date: Option<DateTime<Utc>>,
}

/// Expenses of a household dated within `[from, to)`.
pub async fn expenses_between(
    db: &DatabaseConnection,
    household_id: i64,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<expense::Model>> {
    Expense::find()
        .filter(expense::Column::HouseholdId.eq(household_id))
        .filter(expense::Column::Date.gte(from))
        .filter(expense::Column::Date.lt(to))
        .order_by_desc(expense::Column::Date)
        .order_by_desc(expense::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists expenses, newest first, optionally limited to one month.
pub async fn list_expenses(
    db: &DatabaseConnection,
    actor: &Membership,
    month: Option<Month>,
) -> Result<Vec<expense::Model>> {
    if let Some(month) = month {
        return expenses_between(db, actor.household_id, month.start_utc(), month.end_utc()).await;
    }
    Expense::find()
        .filter(expense::Column::HouseholdId.eq(actor.household_id))
        .order_by_desc(expense::Column::Date)
        .order_by_desc(expense::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn expense_in_household(
    db: &DatabaseConnection,
    household_id: i64,
    expense_id: i64,
) -> Result<expense::Model> {
    Expense::find_by_id(expense_id)
        .filter(expense::Column::HouseholdId.eq(household_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Expense", expense_id))
}

/// Records an expense. Requires member.
#[instrument(skip(db, actor))]
pub async fn create_expense(
    db: &DatabaseConnection,
    actor: &Membership,
    input: NewExpense,
) -> Result<expense::Model> {
    actor.require(Role::Member)?;
    let amount = positive_amount(input.amount)?;
    pet_in_household(db, actor.household_id, input.pet_id).await?;

    let expense = expense::ActiveModel {
        household_id: Set(actor.household_id),
        pet_id: Set(input.pet_id),
        category: Set(input.category.as_str().to_string()),
        amount: Set(amount),
        description: Set(optional_text(input.description)),
        date: Set(input.date),
        member_id: Set(Some(actor.member_id())),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(expense_id = expense.id, amount, category = %input.category, "Expense created");
    Ok(expense)
}

/// Edits an expense. Requires member.
#[instrument(skip(db, actor))]
pub async fn update_expense(
    db: &DatabaseConnection,
    actor: &Membership,
    expense_id: i64,
    update: ExpenseUpdate,
) -> Result<expense::Model> {
    actor.require(Role::Member)?;
    let existing = expense_in_household(db, actor.household_id, expense_id).await?;
    let mut model: expense::ActiveModel = existing.into();

    if let Some(pet_id) = update.pet_id {
        pet_in_household(db, actor.household_id, pet_id).await?;
        model.pet_id = Set(pet_id);
    }
    if let Some(category) = update.category {
        model.category = Set(category.as_str().to_string());
    }
    if let Some(amount) = update.amount {
        model.amount = Set(positive_amount(amount)?);
    }
    if update.description.is_some() {
        model.description = Set(optional_text(update.description));
    }
    if let Some(date) = update.date {
        model.date = Set(date);
    }

    model.update(db).await.map_err(Into::into)
}

/// Deletes an expense. Requires member.
#[instrument(skip(db, actor))]
pub async fn delete_expense(db: &DatabaseConnection, actor: &Membership, expense_id: i64) -> Result<()> {
    actor.require(Role::Member)?;
    let existing = expense_in_household(db, actor.household_id, expense_id).await?;
    existing.delete(db).await?;
    info!(expense_id, "Expense deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0)
            .single()
            .unwrap_or_default()
    }

    fn food(pet_id: i64, amount: f64, date: DateTime<Utc>) -> NewExpense {
        NewExpense {
            pet_id,
            category: ExpenseCategory::Food,
            amount,
            description: Some("Kibble".to_string()),
            date,
        }
    }

    #[tokio::test]
    async fn test_create_expense_rejects_non_positive_amount() -> Result<()> {
        let (db, _household, owner) = setup_with_household().await?;
        let pet = create_test_pet(&db, &owner, "Rex").await?;

        for amount in [0.0, -10.0] {
            let result = create_expense(&db, &owner, food(pet.id, amount, at(2024, 5, 1))).await;
            assert!(matches!(result, Err(Error::InvalidAmount { .. })));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_list_expenses_month_filter() -> Result<()> {
        let (db, _household, owner) = setup_with_household().await?;
        let pet = create_test_pet(&db, &owner, "Rex").await?;
        create_expense(&db, &owner, food(pet.id, 10.0, at(2024, 4, 30))).await?;
        create_expense(&db, &owner, food(pet.id, 20.0, at(2024, 5, 1))).await?;
        create_expense(&db, &owner, food(pet.id, 30.0, at(2024, 5, 31))).await?;

        let may = list_expenses(&db, &owner, Some(Month::parse("2024-05")?)).await?;
        assert_eq!(may.iter().map(|e| e.amount).collect::<Vec<_>>(), vec![30.0, 20.0]);
        assert_eq!(list_expenses(&db, &owner, None).await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_and_delete_expense() -> Result<()> {
        let (db, household, owner) = setup_with_household().await?;
        let pet = create_test_pet(&db, &owner, "Rex").await?;
        let sitter = add_member(&db, household.id, "sitter", Role::Sitter).await?;
        let expense = create_expense(&db, &owner, food(pet.id, 10.0, at(2024, 5, 1))).await?;
        assert_eq!(expense.member_id, Some(owner.member_id()));

        assert!(matches!(
            update_expense(&db, &sitter, expense.id, ExpenseUpdate::default()).await,
            Err(Error::Forbidden { .. })
        ));

        let updated = update_expense(
            &db,
            &owner,
            expense.id,
            ExpenseUpdate {
                category: Some(ExpenseCategory::Vet),
                amount: Some(45.5),
                description: Some(String::new()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(updated.category, "vet");
        assert_eq!(updated.amount, 45.5);
        assert_eq!(updated.description, None);

        delete_expense(&db, &owner, expense.id).await?;
        assert!(matches!(
            delete_expense(&db, &owner, expense.id).await,
            Err(Error::NotFound { entity: "Expense", .. })
        ));
        Ok(())
    }
}
