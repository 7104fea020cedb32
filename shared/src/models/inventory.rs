//! Warehouse (bodega) inventory models and weighted average cost tracking

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::numeric::{
    lenient_date, lenient_decimal, lenient_opt_decimal, lenient_opt_id, saturating_sum,
};

/// A stocked input such as fertilizer or fuel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    pub id: i64,
    #[serde(alias = "nombre")]
    pub name: String,
    #[serde(default, alias = "unidad_medida")]
    pub unit: Option<String>,
    #[serde(default, alias = "stock_actual", deserialize_with = "lenient_decimal")]
    pub current_stock: Decimal,
    /// Weighted average cost (PMP), persisted by the backend as a running value
    #[serde(default, alias = "costo_promedio", deserialize_with = "lenient_decimal")]
    pub weighted_avg_cost: Decimal,
    #[serde(default, alias = "stock_minimo", deserialize_with = "lenient_decimal")]
    pub min_stock: Decimal,
}

impl InventoryItem {
    pub fn position(&self) -> StockPosition {
        StockPosition {
            stock: self.current_stock,
            avg_cost: self.weighted_avg_cost,
        }
    }

    /// Low-stock alert condition shown on the warehouse cards
    pub fn is_below_minimum(&self) -> bool {
        self.current_stock <= self.min_stock
    }

    /// Value of the stock on hand; negative stock is worth nothing
    pub fn stock_value(&self) -> Decimal {
        if self.current_stock > Decimal::ZERO {
            self.current_stock.saturating_mul(self.weighted_avg_cost)
        } else {
            Decimal::ZERO
        }
    }
}

/// Direction of a warehouse movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    #[serde(alias = "Entrada", alias = "Entry")]
    Entry,
    #[serde(alias = "Salida", alias = "Exit")]
    Exit,
    #[serde(other)]
    Unknown,
}

/// A single stock entry or exit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    #[serde(default, deserialize_with = "lenient_opt_id")]
    pub id: Option<i64>,
    #[serde(alias = "insumo_id")]
    pub item_id: i64,
    #[serde(alias = "tipo_movimiento")]
    pub kind: MovementKind,
    #[serde(default, alias = "cantidad", deserialize_with = "lenient_decimal")]
    pub quantity: Decimal,
    /// Required for entries; exits carry the average cost at the time of exit
    #[serde(default, alias = "costo_unitario", deserialize_with = "lenient_opt_decimal")]
    pub unit_cost: Option<Decimal>,
    #[serde(default, alias = "fecha", deserialize_with = "lenient_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, alias = "labor_id", deserialize_with = "lenient_opt_id")]
    pub origin_labor_id: Option<i64>,
    #[serde(default, alias = "referencia")]
    pub origin_note: Option<String>,
}

/// Stock quantity and unit cost at a point in time
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StockPosition {
    pub stock: Decimal,
    pub avg_cost: Decimal,
}

impl StockPosition {
    pub fn new(stock: Decimal, avg_cost: Decimal) -> Self {
        Self { stock, avg_cost }
    }
}

/// Apply one movement to a stock position.
///
/// Entries re-average the unit cost against the stock on hand; exits only
/// reduce the quantity and may drive it negative (the backend stays the
/// source of truth, so nothing is clamped). A non-positive quantity, an
/// unrecognized kind or a result outside the decimal range leaves the
/// position unchanged.
pub fn apply_movement(
    position: StockPosition,
    kind: MovementKind,
    quantity: Decimal,
    unit_cost: Option<Decimal>,
) -> StockPosition {
    if quantity <= Decimal::ZERO {
        return position;
    }

    match kind {
        MovementKind::Entry => {
            let unit_cost = unit_cost
                .filter(|c| !c.is_sign_negative())
                .unwrap_or(Decimal::ZERO);
            let Some(new_stock) = position.stock.checked_add(quantity) else {
                return position;
            };
            if new_stock <= Decimal::ZERO {
                return StockPosition {
                    stock: new_stock,
                    avg_cost: position.avg_cost,
                };
            }
            // Stock at or below zero carries no value into the new average
            let avg_cost = if position.stock > Decimal::ZERO {
                match weighted_average(position, quantity, unit_cost, new_stock) {
                    Some(avg_cost) => avg_cost,
                    None => return position,
                }
            } else {
                unit_cost
            };
            StockPosition {
                stock: new_stock,
                avg_cost,
            }
        }
        MovementKind::Exit => match position.stock.checked_sub(quantity) {
            Some(stock) => StockPosition {
                stock,
                avg_cost: position.avg_cost,
            },
            None => position,
        },
        MovementKind::Unknown => position,
    }
}

/// `(stock * avg + quantity * cost) / new_stock`, falling back to the
/// equivalent `avg + (cost - avg) * quantity / new_stock` when the stock
/// value does not fit
fn weighted_average(
    position: StockPosition,
    quantity: Decimal,
    unit_cost: Decimal,
    new_stock: Decimal,
) -> Option<Decimal> {
    let direct = position
        .stock
        .checked_mul(position.avg_cost)
        .and_then(|held| held.checked_add(quantity.checked_mul(unit_cost)?))
        .and_then(|value| value.checked_div(new_stock));
    direct.or_else(|| {
        unit_cost
            .checked_sub(position.avg_cost)?
            .checked_mul(quantity)?
            .checked_div(new_stock)?
            .checked_add(position.avg_cost)
    })
}

impl StockMovement {
    pub fn apply_to(&self, position: StockPosition) -> StockPosition {
        apply_movement(position, self.kind, self.quantity, self.unit_cost)
    }
}

/// Replay a movement history in chronological order.
///
/// Movements without a date keep their relative order and are applied after
/// dated ones.
pub fn replay_movements(opening: StockPosition, movements: &[StockMovement]) -> StockPosition {
    let mut ordered: Vec<&StockMovement> = movements.iter().collect();
    ordered.sort_by_key(|m| (m.date.is_none(), m.date));
    ordered
        .into_iter()
        .fold(opening, |position, movement| movement.apply_to(position))
}

/// Cost of consuming `quantity` of an item in a field labor
pub fn supply_cost(item: &InventoryItem, quantity: Decimal) -> Decimal {
    if quantity <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    quantity.saturating_mul(item.weighted_avg_cost)
}

/// A supply line attached to a labor, priced at the item's average cost
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplyLine {
    pub item_id: i64,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
}

impl SupplyLine {
    pub fn for_item(item: &InventoryItem, quantity: Decimal) -> Self {
        Self {
            item_id: item.id,
            quantity,
            unit_cost: item.weighted_avg_cost,
        }
    }

    pub fn subtotal(&self) -> Decimal {
        if self.quantity <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.quantity.saturating_mul(self.unit_cost)
    }
}

pub fn labor_supply_total(lines: &[SupplyLine]) -> Decimal {
    saturating_sum(lines.iter().map(SupplyLine::subtotal))
}
