//! HTTP handlers for irrigation endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use shared::IrrigationProgram;

use crate::error::AppResult;
use crate::services::irrigation::{FieldSectors, FieldSummaryView, IrrigationService};
use crate::AppState;

/// Sector water demand grouped by field
pub async fn list_sector_demand(State(state): State<AppState>) -> AppResult<Json<Vec<FieldSectors>>> {
    let service = IrrigationService::new(state.store);
    Ok(Json(service.sector_demand().await?))
}

/// Field configuration totals
pub async fn list_field_summaries(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<FieldSummaryView>>> {
    let service = IrrigationService::new(state.store);
    Ok(Json(service.field_summaries().await?))
}

/// Query parameters for the program history
#[derive(Debug, Deserialize)]
pub struct ProgramHistoryQuery {
    pub year: Option<i32>,
}

/// Finished irrigation programs
pub async fn list_program_history(
    State(state): State<AppState>,
    Query(query): Query<ProgramHistoryQuery>,
) -> AppResult<Json<Vec<IrrigationProgram>>> {
    let service = IrrigationService::new(state.store);
    Ok(Json(service.program_history(query.year).await?))
}
