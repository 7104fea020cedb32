//! HTTP handlers for partner capital accounts

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{CapitalMovementKind, DeletionPolicy, MovementFilter, PartnerBalance, PartnerSort};

use crate::error::AppResult;
use crate::services::partners::{MovementView, PartnerService, RecordCapitalInput};
use crate::AppState;

/// Query parameters for the balance list
#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    #[serde(default)]
    pub sort: PartnerSort,
}

/// Balance per partner
pub async fn list_partner_balances(
    State(state): State<AppState>,
    Query(query): Query<BalanceQuery>,
) -> AppResult<Json<Vec<PartnerBalance>>> {
    let service = PartnerService::new(state.store);
    Ok(Json(service.balances(query.sort).await?))
}

/// Query parameters for the movement history
#[derive(Debug, Deserialize)]
pub struct MovementQuery {
    pub kind: Option<CapitalMovementKind>,
    pub partner_id: Option<i64>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// Movement history with origin annotations
pub async fn list_capital_movements(
    State(state): State<AppState>,
    Query(query): Query<MovementQuery>,
) -> AppResult<Json<Vec<MovementView>>> {
    let filter = MovementFilter {
        kind: query.kind,
        partner_id: query.partner_id,
        year: query.year,
        month: query.month,
    };
    let limit = state.config.dashboard.movement_history_limit;
    let service = PartnerService::new(state.store);
    Ok(Json(service.movements(filter, limit).await?))
}

/// Record a manual contribution or withdrawal
pub async fn record_capital_movement(
    State(state): State<AppState>,
    Json(input): Json<RecordCapitalInput>,
) -> AppResult<(StatusCode, Json<MovementView>)> {
    let service = PartnerService::new(state.store);
    let view = service.record_movement(input).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Delete a movement; linked expense movements are refused with 409
pub async fn delete_capital_movement(
    State(state): State<AppState>,
    Path(movement_id): Path<i64>,
) -> AppResult<Json<DeletionPolicy>> {
    let service = PartnerService::new(state.store);
    Ok(Json(service.delete_movement(movement_id).await?))
}
