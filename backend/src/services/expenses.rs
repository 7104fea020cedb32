//! Expense service: payment totals and upcoming installments

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    expense_totals, next_due, sort_expenses, DateRange, Expense, ExpenseSort, ExpenseTotals,
    NextDue, PaymentStatus,
};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::store::{decode_rows, Collection, Filter, RecordStore};

#[derive(Clone)]
pub struct ExpenseService {
    store: Arc<dyn RecordStore>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpenseSummary {
    #[serde(flatten)]
    pub totals: ExpenseTotals,
    pub expense_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpcomingExpense {
    pub expense_id: i64,
    pub description: Option<String>,
    pub amount: Decimal,
    pub payment_status: PaymentStatus,
    pub next_due: NextDue,
}

impl ExpenseService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    async fn load(&self, range: DateRange) -> AppResult<Vec<Expense>> {
        if range.is_inverted() {
            return Err(AppError::validation(
                "from",
                "Start date must not be after end date",
                "La fecha inicial no puede ser posterior a la final",
            ));
        }
        let mut filters = Vec::new();
        if let Some(start) = range.start {
            filters.push(Filter::gte("fecha", start.to_string()));
        }
        if let Some(end) = range.end {
            filters.push(Filter::lte("fecha", end.to_string()));
        }
        let rows = self.store.fetch_all(Collection::Expenses, &filters).await?;
        Ok(decode_rows(Collection::Expenses, rows))
    }

    /// Expense list in the requested order
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, range: DateRange, sort: ExpenseSort) -> AppResult<Vec<Expense>> {
        let mut expenses = self.load(range).await?;
        sort_expenses(&mut expenses, sort);
        Ok(expenses)
    }

    /// Total, pending and paid amounts for the period
    #[tracing::instrument(skip(self))]
    pub async fn summary(&self, range: DateRange) -> AppResult<ExpenseSummary> {
        let expenses = self.load(range).await?;
        Ok(ExpenseSummary {
            totals: expense_totals(&expenses),
            expense_count: expenses.len(),
        })
    }

    /// Unpaid expenses with their next due installment, soonest first
    #[tracing::instrument(skip(self))]
    pub async fn upcoming(&self, today: NaiveDate) -> AppResult<Vec<UpcomingExpense>> {
        let expenses = self.load(DateRange::default()).await?;
        let mut upcoming: Vec<UpcomingExpense> = expenses
            .into_iter()
            .filter_map(|expense| {
                let next = next_due(&expense, today)?;
                Some(UpcomingExpense {
                    expense_id: expense.id,
                    description: expense.description,
                    amount: expense.amount,
                    payment_status: expense.payment_status,
                    next_due: next,
                })
            })
            .collect();
        upcoming.sort_by(|a, b| {
            a.next_due
                .date
                .cmp(&b.next_due.date)
                .then_with(|| a.expense_id.cmp(&b.expense_id))
        });

        let overdue = upcoming
            .iter()
            .filter(|u| u.next_due.urgency == shared::Urgency::Overdue)
            .count();
        if overdue > 0 {
            tracing::info!(overdue, "Expenses with overdue installments");
        }
        Ok(upcoming)
    }
}
