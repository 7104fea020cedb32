//! Expense models, installment due dates and payment totals

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::numeric::{lenient_date, lenient_decimal, null_as_default, non_negative};

/// Days ahead of a due date during which it is flagged as coming up
pub const DUE_SOON_DAYS: i64 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[serde(alias = "Pagado")]
    Paid,
    #[serde(alias = "Parcial")]
    Partial,
    #[default]
    #[serde(alias = "Pendiente", other)]
    Pending,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    #[serde(alias = "Pagado", alias = "Pagada")]
    Paid,
    #[default]
    #[serde(alias = "Pendiente", other)]
    Pending,
}

/// One scheduled partial payment (cuota) of an expense
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installment {
    #[serde(default, alias = "fecha_vencimiento", deserialize_with = "lenient_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, alias = "estado", deserialize_with = "null_as_default")]
    pub status: InstallmentStatus,
    #[serde(default, alias = "monto", deserialize_with = "lenient_decimal")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    #[serde(default, alias = "fecha", deserialize_with = "lenient_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, alias = "descripcion")]
    pub description: Option<String>,
    #[serde(default, alias = "monto", deserialize_with = "lenient_decimal")]
    pub amount: Decimal,
    #[serde(default, alias = "estado_pago", deserialize_with = "null_as_default")]
    pub payment_status: PaymentStatus,
    #[serde(default, alias = "cuotas", deserialize_with = "null_as_default")]
    pub installments: Vec<Installment>,
}

/// How close a pending due date is
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Overdue,
    Soon,
    Normal,
}

impl Urgency {
    /// Classify by calendar days left until the due date
    pub fn from_days_remaining(days: i64) -> Self {
        if days < 0 {
            Urgency::Overdue
        } else if days <= DUE_SOON_DAYS {
            Urgency::Soon
        } else {
            Urgency::Normal
        }
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Urgency::Overdue => write!(f, "Overdue"),
            Urgency::Soon => write!(f, "Soon"),
            Urgency::Normal => write!(f, "Normal"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NextDue {
    pub date: NaiveDate,
    pub days_remaining: i64,
    pub urgency: Urgency,
}

/// Earliest pending installment of an unpaid expense, relative to `today`.
///
/// Paid expenses, and expenses without a dated pending installment, have no
/// next due date.
pub fn next_due(expense: &Expense, today: NaiveDate) -> Option<NextDue> {
    if expense.payment_status == PaymentStatus::Paid {
        return None;
    }
    let date = expense
        .installments
        .iter()
        .filter(|i| i.status == InstallmentStatus::Pending)
        .filter_map(|i| i.due_date)
        .min()?;
    let days_remaining = (date - today).num_days();
    Some(NextDue {
        date,
        days_remaining,
        urgency: Urgency::from_days_remaining(days_remaining),
    })
}

/// KPI cards of the finance dashboard
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ExpenseTotals {
    pub total: Decimal,
    /// Expenses still pending or only partially paid
    pub pending: Decimal,
    pub paid: Decimal,
}

pub fn expense_totals<'a>(expenses: impl IntoIterator<Item = &'a Expense>) -> ExpenseTotals {
    let mut totals = ExpenseTotals::default();
    for expense in expenses {
        let amount = non_negative(expense.amount);
        totals.total = totals.total.saturating_add(amount);
        if matches!(
            expense.payment_status,
            PaymentStatus::Pending | PaymentStatus::Partial
        ) {
            totals.pending = totals.pending.saturating_add(amount);
        }
    }
    totals.paid = totals.total.saturating_sub(totals.pending);
    totals
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseSort {
    #[default]
    DateDesc,
    DateAsc,
    AmountDesc,
    AmountAsc,
}

/// Sort the expense list; undated expenses go last for either date order
pub fn sort_expenses(expenses: &mut [Expense], sort: ExpenseSort) {
    match sort {
        ExpenseSort::DateDesc => expenses.sort_by(|a, b| match (a.date, b.date) {
            (Some(x), Some(y)) => y.cmp(&x),
            (x, y) => x.is_none().cmp(&y.is_none()),
        }),
        ExpenseSort::DateAsc => expenses.sort_by(|a, b| match (a.date, b.date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (x, y) => x.is_none().cmp(&y.is_none()),
        }),
        ExpenseSort::AmountDesc => expenses.sort_by(|a, b| b.amount.cmp(&a.amount)),
        ExpenseSort::AmountAsc => expenses.sort_by(|a, b| a.amount.cmp(&b.amount)),
    }
}
