//! Read-only aggregate procedures: `dashboard.get`, `finance.*` and `calendar.*`.

use crate::{
    api::{
        AppState,
        extract::{HouseholdMember, Input},
    },
    core::{
        calendar::{self, CalendarEvent, Upcoming},
        dashboard::{self, Dashboard},
        dates::Month,
        finance::{self, FinanceSummary, TrendPoint},
    },
    errors::Result,
};
use axum::{Json, Router, extract::State, routing::post};
use chrono::Utc;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Input naming a `YYYY-MM` month.
#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    /// Month
    pub month: Month,
}

/// Input for `finance.trend`.
#[derive(Debug, Default, Deserialize)]
pub struct TrendQuery {
    /// Last month of the trend; the current month when omitted
    #[serde(default)]
    pub end_month: Option<Month>,
    /// Number of months, 1 to 24
    #[serde(default)]
    pub months: Option<u32>,
}

/// Input for `calendar.upcoming`.
#[derive(Debug, Default, Deserialize)]
pub struct UpcomingQuery {
    /// Maximum events to return
    #[serde(default)]
    pub limit: Option<u64>,
}

/// Routes for dashboard, finance and calendar.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rpc/dashboard.get", post(get_dashboard))
        .route("/rpc/finance.summary", post(finance_summary))
        .route("/rpc/finance.trend", post(finance_trend))
        .route("/rpc/calendar.monthEvents", post(month_events))
        .route("/rpc/calendar.upcoming", post(upcoming))
}

async fn get_dashboard(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
) -> Result<Json<Dashboard>> {
    dashboard::get_dashboard(&state.db, &actor).await.map(Json)
}

async fn finance_summary(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(query): Input<MonthQuery>,
) -> Result<Json<FinanceSummary>> {
    finance::finance_summary(&state.db, &actor, query.month)
        .await
        .map(Json)
}

async fn finance_trend(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(query): Input<TrendQuery>,
) -> Result<Json<Vec<TrendPoint>>> {
    let end = query.end_month.unwrap_or_else(Month::current);
    finance::monthly_trend(&state.db, &actor, end, query.months)
        .await
        .map(Json)
}

async fn month_events(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(query): Input<MonthQuery>,
) -> Result<Json<BTreeMap<String, Vec<CalendarEvent>>>> {
    calendar::month_events(&state.db, &actor, query.month)
        .await
        .map(Json)
}

async fn upcoming(
    State(state): State<AppState>,
    HouseholdMember(actor): HouseholdMember,
    Input(query): Input<UpcomingQuery>,
) -> Result<Json<Upcoming>> {
    calendar::upcoming(&state.db, &actor, query.limit, Utc::now())
        .await
        .map(Json)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::float_cmp)]
    use crate::api::test_support::call_in;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_finance_summary_merges_sources() {
        let (db, household, owner) = setup_with_household().await.unwrap();
        let pet = create_test_pet(&db, &owner, "Rex").await.unwrap();
        let (state, _storage) = test_state(db);

        let (status, _) = call_in(
            &state,
            "expense.create",
            "owner_user",
            household.id,
            json!({ "pet_id": pet.id, "category": "food", "amount": 30.0, "date": "2024-05-03T10:00:00Z" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call_in(
            &state,
            "health.createRecord",
            "owner_user",
            household.id,
            json!({
                "pet_id": pet.id,
                "record_type": "checkup",
                "date": "2024-05-20T09:00:00Z",
                "cost": 70.0,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, summary) = call_in(
            &state,
            "finance.summary",
            "owner_user",
            household.id,
            json!({ "month": "2024-05" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["month"], "2024-05");
        assert_eq!(summary["monthly_total"].as_f64().unwrap(), 100.0);
        assert_eq!(summary["percent_change"].as_f64().unwrap(), 100.0);
        assert_eq!(summary["by_pet"][0]["pet_name"], "Rex");
        assert_eq!(summary["recent"].as_array().unwrap().len(), 2);
        assert_eq!(summary["by_category"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_finance_trend_rejects_too_many_months() {
        let (db, household, _owner) = setup_with_household().await.unwrap();
        let (state, _storage) = test_state(db);

        let (status, points) = call_in(
            &state,
            "finance.trend",
            "owner_user",
            household.id,
            json!({ "end_month": "2024-05", "months": 3 }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(points[0]["month"], "2024-03");
        assert_eq!(points[2]["month"], "2024-05");

        let (status, _) = call_in(
            &state,
            "finance.trend",
            "owner_user",
            household.id,
            json!({ "months": 25 }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_calendar_month_groups_by_day() {
        let (db, household, _owner) = setup_with_household().await.unwrap();
        let (state, _storage) = test_state(db);

        let (status, days) = call_in(
            &state,
            "calendar.monthEvents",
            "owner_user",
            household.id,
            json!({ "month": "2024-12" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(days["2024-12-25"][0]["kind"], "holiday");
        assert_eq!(days["2024-12-25"][0]["title"], "Christmas Day");
    }

    #[tokio::test]
    async fn test_upcoming_and_dashboard_respond() {
        let (db, household, _owner) = setup_with_household().await.unwrap();
        let (state, _storage) = test_state(db);

        let (status, upcoming) = call_in(
            &state,
            "calendar.upcoming",
            "owner_user",
            household.id,
            json!({ "limit": 100 }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(upcoming["total"].as_u64().unwrap() >= upcoming["events"].as_array().unwrap().len() as u64);

        let (status, dashboard) =
            call_in(&state, "dashboard.get", "owner_user", household.id, json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(dashboard["role"], "owner");
        assert_eq!(dashboard["members"].as_array().unwrap().len(), 1);
    }
}
