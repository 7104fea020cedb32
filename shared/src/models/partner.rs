//! Partner capital accounts: contributions, withdrawals and balances

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::numeric::{lenient_date, lenient_decimal, lenient_opt_id, non_negative};

/// A farm partner (socio)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partner {
    #[serde(alias = "socio_id")]
    pub id: i64,
    #[serde(alias = "nombre", alias = "socio_nombre")]
    pub name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CapitalMovementKind {
    #[serde(alias = "Aporte")]
    Contribution,
    #[serde(alias = "Retiro")]
    Withdrawal,
    #[serde(other)]
    Unknown,
}

/// A movement in a partner's capital account (movimientos_billetera)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalMovement {
    #[serde(default, deserialize_with = "lenient_opt_id")]
    pub id: Option<i64>,
    #[serde(alias = "socio_id")]
    pub partner_id: i64,
    #[serde(alias = "tipo")]
    pub kind: CapitalMovementKind,
    #[serde(default, alias = "monto", deserialize_with = "lenient_decimal")]
    pub amount: Decimal,
    #[serde(default, alias = "fecha", deserialize_with = "lenient_date")]
    pub date: Option<NaiveDate>,
    /// May embed a system origin tag, see [`crate::models::parse_origin`]
    #[serde(default, alias = "descripcion")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PartnerTotals {
    pub contributed: Decimal,
    pub withdrawn: Decimal,
    pub balance: Decimal,
}

/// Fold capital movements into per-partner totals.
///
/// Only partners with at least one movement appear. Negative amounts and
/// unrecognized kinds contribute nothing.
pub fn aggregate_partner_ledger(movements: &[CapitalMovement]) -> BTreeMap<i64, PartnerTotals> {
    let mut ledger: BTreeMap<i64, PartnerTotals> = BTreeMap::new();
    for movement in movements {
        let totals = ledger.entry(movement.partner_id).or_default();
        let amount = non_negative(movement.amount);
        match movement.kind {
            CapitalMovementKind::Contribution => {
                totals.contributed = totals.contributed.saturating_add(amount)
            }
            CapitalMovementKind::Withdrawal => {
                totals.withdrawn = totals.withdrawn.saturating_add(amount)
            }
            CapitalMovementKind::Unknown => {}
        }
    }
    for totals in ledger.values_mut() {
        totals.balance = totals.contributed.saturating_sub(totals.withdrawn);
    }
    ledger
}

/// A balance row on the partner accounts screen
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartnerBalance {
    pub partner_id: i64,
    pub name: String,
    #[serde(flatten)]
    pub totals: PartnerTotals,
}

pub const UNKNOWN_PARTNER: &str = "Unknown Partner";

/// Merge ledger totals against the partner master list.
///
/// Every listed partner gets a row (zero totals if they never moved money);
/// partners that only appear in the ledger are kept under a placeholder name.
pub fn merge_with_roster(
    ledger: &BTreeMap<i64, PartnerTotals>,
    partners: &[Partner],
) -> Vec<PartnerBalance> {
    let mut rows: Vec<PartnerBalance> = partners
        .iter()
        .map(|p| PartnerBalance {
            partner_id: p.id,
            name: p.name.clone(),
            totals: ledger.get(&p.id).copied().unwrap_or_default(),
        })
        .collect();

    for (partner_id, totals) in ledger {
        if !partners.iter().any(|p| p.id == *partner_id) {
            rows.push(PartnerBalance {
                partner_id: *partner_id,
                name: UNKNOWN_PARTNER.to_string(),
                totals: *totals,
            });
        }
    }
    rows
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PartnerSort {
    #[default]
    Name,
    BalanceDesc,
    BalanceAsc,
}

pub fn sort_partner_balances(rows: &mut [PartnerBalance], sort: PartnerSort) {
    match sort {
        PartnerSort::Name => rows.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase())),
        PartnerSort::BalanceDesc => rows.sort_by(|a, b| b.totals.balance.cmp(&a.totals.balance)),
        PartnerSort::BalanceAsc => rows.sort_by(|a, b| a.totals.balance.cmp(&b.totals.balance)),
    }
}

/// History filters of the partner accounts screen; `None` means "all"
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovementFilter {
    pub kind: Option<CapitalMovementKind>,
    pub partner_id: Option<i64>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl MovementFilter {
    pub fn matches(&self, movement: &CapitalMovement) -> bool {
        if self.kind.is_some_and(|k| k != movement.kind) {
            return false;
        }
        if self.partner_id.is_some_and(|p| p != movement.partner_id) {
            return false;
        }
        if self.year.is_some() || self.month.is_some() {
            let Some(date) = movement.date else {
                return false;
            };
            if self.year.is_some_and(|y| y != date.year()) {
                return false;
            }
            if self.month.is_some_and(|m| m != date.month()) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mov(partner_id: i64, kind: CapitalMovementKind, amount: i64) -> CapitalMovement {
        CapitalMovement {
            id: None,
            partner_id,
            kind,
            amount: Decimal::from(amount),
            date: NaiveDate::from_ymd_opt(2024, 5, 10),
            description: None,
        }
    }

    #[test]
    fn test_ledger_saturates_on_huge_amounts() {
        let mut big = mov(1, CapitalMovementKind::Contribution, 0);
        big.amount = Decimal::MAX;
        let ledger = aggregate_partner_ledger(&[big.clone(), big.clone()]);
        assert_eq!(ledger[&1].contributed, Decimal::MAX);

        let mut out = big;
        out.kind = CapitalMovementKind::Withdrawal;
        let ledger = aggregate_partner_ledger(&[out.clone(), out]);
        assert_eq!(ledger[&1].balance, Decimal::MIN);
    }

    #[test]
    fn test_empty_ledger() {
        assert!(aggregate_partner_ledger(&[]).is_empty());
    }

    #[test]
    fn test_contribution_minus_withdrawal() {
        let ledger = aggregate_partner_ledger(&[
            mov(1, CapitalMovementKind::Contribution, 100),
            mov(1, CapitalMovementKind::Withdrawal, 30),
        ]);
        assert_eq!(
            ledger.get(&1),
            Some(&PartnerTotals {
                contributed: Decimal::from(100),
                withdrawn: Decimal::from(30),
                balance: Decimal::from(70),
            })
        );
    }

    #[test]
    fn test_negative_and_unknown_are_ignored() {
        let ledger = aggregate_partner_ledger(&[
            mov(2, CapitalMovementKind::Contribution, -50),
            mov(2, CapitalMovementKind::Unknown, 500),
            mov(2, CapitalMovementKind::Withdrawal, 20),
        ]);
        let totals = ledger[&2];
        assert_eq!(totals.contributed, Decimal::ZERO);
        assert_eq!(totals.balance, Decimal::from(-20));
    }

    #[test]
    fn test_decode_wallet_row() {
        let m: CapitalMovement = serde_json::from_value(json!({
            "id": 9, "socio_id": 3, "tipo": "Retiro", "monto": "15000",
            "fecha": "2024-02-01", "descripcion": "Pago Gasto: riego [GID:12]"
        }))
        .unwrap();
        assert_eq!(m.kind, CapitalMovementKind::Withdrawal);
        assert_eq!(m.amount, Decimal::from(15000));
        assert_eq!(m.partner_id, 3);
    }

    #[test]
    fn test_roster_merge_adds_zero_rows_and_orphans() {
        let ledger = aggregate_partner_ledger(&[
            mov(1, CapitalMovementKind::Contribution, 100),
            mov(9, CapitalMovementKind::Contribution, 5),
        ]);
        let partners = vec![
            Partner { id: 1, name: "Ana".into() },
            Partner { id: 2, name: "Luis".into() },
        ];
        let rows = merge_with_roster(&ledger, &partners);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].name, "Luis");
        assert_eq!(rows[1].totals, PartnerTotals::default());
        assert_eq!(rows[2].partner_id, 9);
        assert_eq!(rows[2].name, UNKNOWN_PARTNER);
    }

    #[test]
    fn test_sort_balances() {
        let ledger = aggregate_partner_ledger(&[
            mov(1, CapitalMovementKind::Contribution, 100),
            mov(2, CapitalMovementKind::Contribution, 300),
        ]);
        let partners = vec![
            Partner { id: 2, name: "beatriz".into() },
            Partner { id: 1, name: "Ana".into() },
        ];
        let mut rows = merge_with_roster(&ledger, &partners);

        sort_partner_balances(&mut rows, PartnerSort::Name);
        assert_eq!(rows[0].name, "Ana");

        sort_partner_balances(&mut rows, PartnerSort::BalanceDesc);
        assert_eq!(rows[0].partner_id, 2);

        sort_partner_balances(&mut rows, PartnerSort::BalanceAsc);
        assert_eq!(rows[0].partner_id, 1);
    }

    #[test]
    fn test_movement_filter() {
        let m = mov(1, CapitalMovementKind::Contribution, 100);
        assert!(MovementFilter::default().matches(&m));
        assert!(MovementFilter { year: Some(2024), month: Some(5), ..Default::default() }.matches(&m));
        assert!(!MovementFilter { month: Some(6), ..Default::default() }.matches(&m));
        assert!(!MovementFilter { partner_id: Some(2), ..Default::default() }.matches(&m));
        assert!(!MovementFilter {
            kind: Some(CapitalMovementKind::Withdrawal),
            ..Default::default()
        }
        .matches(&m));

        let undated = CapitalMovement { date: None, ..m };
        assert!(!MovementFilter { year: Some(2024), ..Default::default() }.matches(&undated));
    }
}
