//! Warehouse service: stock positions, weighted average cost and alerts

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::{apply_movement, replay_movements, InventoryItem, MovementKind, StockMovement, StockPosition};
use std::sync::Arc;
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};
use crate::store::{
    decode_row, decode_rows, Collection, Filter, LockedWrite, RecordStore, StoreResult,
};

/// Inventory service for the warehouse (bodega) screens
#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn RecordStore>,
}

/// Item row of the warehouse list
#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: InventoryItem,
    pub stock_value: Decimal,
    pub low_stock: bool,
}

impl From<InventoryItem> for ItemView {
    fn from(item: InventoryItem) -> Self {
        Self {
            stock_value: item.stock_value(),
            low_stock: item.is_below_minimum(),
            item,
        }
    }
}

fn positive_decimal(value: &Decimal) -> Result<(), ValidationError> {
    shared::validate_positive_amount(*value).map_err(|msg| {
        let mut err = ValidationError::new("positive");
        err.message = Some(msg.into());
        err
    })
}

fn non_negative_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("Total cost cannot be negative".into());
        return Err(err);
    }
    Ok(())
}

/// Input for recording a stock entry or exit
#[derive(Debug, Deserialize, Validate)]
pub struct RecordMovementInput {
    pub item_id: i64,
    pub kind: MovementKind,
    #[validate(custom = "positive_decimal")]
    pub quantity: Decimal,
    /// Purchase total for entries; the unit cost is derived from it
    #[validate(custom = "non_negative_decimal")]
    pub total_cost: Option<Decimal>,
    pub date: Option<NaiveDate>,
    #[validate(length(max = 200))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordedMovement {
    pub movement: StockMovement,
    pub previous: StockPosition,
    pub position: StockPosition,
}

/// Stored item position against the one rebuilt from its movement history
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub item_id: i64,
    pub movement_count: usize,
    pub stored: StockPosition,
    pub replayed: StockPosition,
    pub consistent: bool,
}

fn movement_label(kind: MovementKind) -> &'static str {
    match kind {
        MovementKind::Entry => "Entrada",
        MovementKind::Exit => "Salida",
        MovementKind::Unknown => "Desconocido",
    }
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    async fn load_item(&self, item_id: i64) -> AppResult<InventoryItem> {
        let row = self
            .store
            .fetch_one(Collection::Items, item_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))?;
        Ok(decode_row(Collection::Items, row)?)
    }

    /// List all items with their stock value and low-stock flag
    #[tracing::instrument(skip(self))]
    pub async fn list_items(&self) -> AppResult<Vec<ItemView>> {
        let rows = self.store.fetch_all(Collection::Items, &[]).await?;
        let mut items: Vec<InventoryItem> = decode_rows(Collection::Items, rows);
        items.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(items.into_iter().map(ItemView::from).collect())
    }

    /// Items at or below their minimum stock
    #[tracing::instrument(skip(self))]
    pub async fn low_stock_alerts(&self) -> AppResult<Vec<ItemView>> {
        let alerts: Vec<ItemView> = self
            .list_items()
            .await?
            .into_iter()
            .filter(|view| view.low_stock)
            .collect();
        if !alerts.is_empty() {
            tracing::info!(count = alerts.len(), "Items below minimum stock");
        }
        Ok(alerts)
    }

    /// Record a movement and update the item's stock and average cost.
    /// The item row stays locked from read to write.
    #[tracing::instrument(skip(self, input), fields(item_id = input.item_id))]
    pub async fn record_movement(&self, input: RecordMovementInput) -> AppResult<RecordedMovement> {
        input.validate()?;

        // Exits take the average from the locked row
        let entry_unit_cost = match input.kind {
            MovementKind::Entry => {
                let total_cost = input.total_cost.ok_or_else(|| {
                    AppError::validation(
                        "total_cost",
                        "Total cost is required for entries",
                        "El costo total es obligatorio para entradas",
                    )
                })?;
                let unit_cost = total_cost.checked_div(input.quantity).ok_or_else(|| {
                    AppError::validation(
                        "total_cost",
                        "Total cost is too large for the quantity",
                        "El costo total es demasiado grande para la cantidad",
                    )
                })?;
                Some(unit_cost)
            }
            MovementKind::Exit => None,
            MovementKind::Unknown => {
                return Err(AppError::validation(
                    "kind",
                    "Movement kind must be entry or exit",
                    "El tipo de movimiento debe ser entrada o salida",
                ))
            }
        };

        let kind = input.kind;
        let quantity = input.quantity;
        let date = input.date.unwrap_or_else(|| Utc::now().date_naive());
        let note = input.note;
        let mut applied: Option<(StockPosition, StockPosition)> = None;

        let outcome = self
            .store
            .update_locked(
                Collection::Items,
                input.item_id,
                Box::new(|row: Value| -> StoreResult<LockedWrite> {
                    let item: InventoryItem = decode_row(Collection::Items, row)?;
                    let previous = item.position();
                    let unit_cost = entry_unit_cost.unwrap_or(item.weighted_avg_cost);
                    let position = apply_movement(previous, kind, quantity, Some(unit_cost));
                    applied = Some((previous, position));
                    Ok(LockedWrite {
                        patch: json!({
                            "stock_actual": position.stock,
                            "costo_promedio": position.avg_cost,
                        }),
                        insert: Some((
                            Collection::StockMovements,
                            json!({
                                "insumo_id": item.id,
                                "tipo_movimiento": movement_label(kind),
                                "cantidad": quantity,
                                "costo_unitario": unit_cost,
                                "fecha": date,
                                "referencia": note,
                            }),
                        )),
                    })
                }),
            )
            .await?
            .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))?;

        let (previous, position) = applied
            .ok_or_else(|| AppError::Internal("Locked update produced no position".to_string()))?;
        let row = outcome
            .inserted
            .ok_or_else(|| AppError::Internal("Stock movement was not stored".to_string()))?;
        let movement: StockMovement = decode_row(Collection::StockMovements, row)?;

        if position.stock.is_sign_negative() {
            tracing::warn!(stock = %position.stock, "Exit leaves negative stock");
        }
        tracing::info!(
            stock = %position.stock,
            avg_cost = %position.avg_cost,
            "Stock movement recorded"
        );

        Ok(RecordedMovement {
            movement,
            previous,
            position,
        })
    }

    /// Rebuild an item's position from its full movement history
    #[tracing::instrument(skip(self))]
    pub async fn replay_item(&self, item_id: i64) -> AppResult<ReplayReport> {
        let item = self.load_item(item_id).await?;
        let rows = self
            .store
            .fetch_all(Collection::StockMovements, &[Filter::eq("insumo_id", item_id)])
            .await?;
        let movements: Vec<StockMovement> = decode_rows(Collection::StockMovements, rows);

        let replayed = replay_movements(StockPosition::default(), &movements);
        let stored = item.position();
        let consistent = replayed.stock == stored.stock && replayed.avg_cost == stored.avg_cost;
        if !consistent {
            tracing::warn!(
                stored_stock = %stored.stock,
                replayed_stock = %replayed.stock,
                "Stored position differs from movement history"
            );
        }

        Ok(ReplayReport {
            item_id,
            movement_count: movements.len(),
            stored,
            replayed,
            consistent,
        })
    }
}
