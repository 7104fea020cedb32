//! HTTP handlers for warehouse endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::error::AppResult;
use crate::services::inventory::{
    InventoryService, ItemView, RecordMovementInput, RecordedMovement, ReplayReport,
};
use crate::AppState;

/// List warehouse items with stock value
pub async fn list_items(State(state): State<AppState>) -> AppResult<Json<Vec<ItemView>>> {
    let service = InventoryService::new(state.store);
    Ok(Json(service.list_items().await?))
}

/// Items at or below minimum stock
pub async fn list_stock_alerts(State(state): State<AppState>) -> AppResult<Json<Vec<ItemView>>> {
    let service = InventoryService::new(state.store);
    Ok(Json(service.low_stock_alerts().await?))
}

/// Record a stock entry or exit
pub async fn record_stock_movement(
    State(state): State<AppState>,
    Json(input): Json<RecordMovementInput>,
) -> AppResult<(StatusCode, Json<RecordedMovement>)> {
    let service = InventoryService::new(state.store);
    let recorded = service.record_movement(input).await?;
    Ok((StatusCode::CREATED, Json(recorded)))
}

/// Recompute an item's position from its movement history
pub async fn replay_item(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
) -> AppResult<Json<ReplayReport>> {
    let service = InventoryService::new(state.store);
    Ok(Json(service.replay_item(item_id).await?))
}
