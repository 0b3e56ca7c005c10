//! `expense.*` procedures.

use crate::{
    api::{
        AppState, ok,
        extract::{ById, HouseholdMember, Input, Patch},
    },
    core::{
        dates::Month,
        expense::{self, ExpenseUpdate, NewExpense},
    },
    entities::expense as expense_entity,
    errors::Result,
};
use axum::{Json, Router, extract::State, routing::post};
use serde::Deserialize;
use serde_json::Value;

/// Input for `expense.list`.
#[derive(Debug, Default, Deserialize)]
pub struct ExpenseQuery {
    /// Only expenses dated in this `YYYY-MM` month
    #[serde(default)]
    pub month: Option<Month>,
}

/// Routes for expenses.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rpc/expense.list", post(list))
        .route("/rpc/expense.create", post(create))
        .route("/rpc/expense.update", post(update))
        .route("/rpc/expense.delete", post(delete))
}

async fn list(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(query): Input<ExpenseQuery>,
) -> Result<Json<Vec<expense_entity::Model>>> {
    expense::list_expenses(&state.db, &actor, query.month)
        .await
        .map(Json)
}

async fn create(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(input): Input<NewExpense>,
) -> Result<Json<expense_entity::Model>> {
    expense::create_expense(&state.db, &actor, input)
        .await
        .map(Json)
}

async fn update(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(patch): Input<Patch<ExpenseUpdate>>,
) -> Result<Json<expense_entity::Model>> {
    expense::update_expense(&state.db, &actor, patch.id, patch.changes)
        .await
        .map(Json)
}

async fn delete(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(input): Input<ById>,
) -> Result<Json<Value>> {
    expense::delete_expense(&state.db, &actor, input.id).await?;
    Ok(ok())
}
