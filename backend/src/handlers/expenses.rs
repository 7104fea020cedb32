//! HTTP handlers for expense endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use shared::{DateRange, Expense, ExpenseSort};

use crate::error::AppResult;
use crate::services::expenses::{ExpenseService, ExpenseSummary, UpcomingExpense};
use crate::AppState;

/// Query parameters for expense listings
#[derive(Debug, Deserialize)]
pub struct ExpenseQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub sort: ExpenseSort,
}

impl ExpenseQuery {
    fn range(&self) -> DateRange {
        DateRange::new(self.from, self.to)
    }
}

/// Expense list
pub async fn list_expenses(
    State(state): State<AppState>,
    Query(query): Query<ExpenseQuery>,
) -> AppResult<Json<Vec<Expense>>> {
    let service = ExpenseService::new(state.store);
    Ok(Json(service.list(query.range(), query.sort).await?))
}

/// Total, pending and paid amounts
pub async fn get_expense_summary(
    State(state): State<AppState>,
    Query(query): Query<ExpenseQuery>,
) -> AppResult<Json<ExpenseSummary>> {
    let service = ExpenseService::new(state.store);
    Ok(Json(service.summary(query.range()).await?))
}

/// Query parameters for upcoming installments
#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    /// Reference date; defaults to the server's current date
    pub today: Option<NaiveDate>,
}

/// Unpaid expenses by next due date
pub async fn list_upcoming_expenses(
    State(state): State<AppState>,
    Query(query): Query<UpcomingQuery>,
) -> AppResult<Json<Vec<UpcomingExpense>>> {
    let today = query.today.unwrap_or_else(|| Utc::now().date_naive());
    let service = ExpenseService::new(state.store);
    Ok(Json(service.upcoming(today).await?))
}
