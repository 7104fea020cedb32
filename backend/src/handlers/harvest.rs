//! HTTP handlers for harvest dashboards

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use shared::{CalibreRow, HarvestFilter, SectorSalesHistory};

use crate::error::AppResult;
use crate::services::harvest::{HarvestDashboard, HarvestService};
use crate::AppState;

/// Sales dashboard with top clients
pub async fn get_harvest_dashboard(
    State(state): State<AppState>,
    Query(filter): Query<HarvestFilter>,
) -> AppResult<Json<HarvestDashboard>> {
    let top_n = state.config.dashboard.top_clients;
    let service = HarvestService::new(state.store);
    Ok(Json(service.dashboard(filter, top_n).await?))
}

/// Kilos and amounts per year and calibre
pub async fn list_calibre_rows(
    State(state): State<AppState>,
    Query(filter): Query<HarvestFilter>,
) -> AppResult<Json<Vec<CalibreRow>>> {
    let service = HarvestService::new(state.store);
    Ok(Json(service.calibre_rows(filter).await?))
}

/// Calibre table as a CSV download
pub async fn export_calibre_csv(
    State(state): State<AppState>,
    Query(filter): Query<HarvestFilter>,
) -> AppResult<impl IntoResponse> {
    let service = HarvestService::new(state.store);
    let body = service.calibre_csv(filter).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"calibres.csv\""),
        ],
        body,
    ))
}

/// Sales history of a sector
pub async fn get_sector_harvest_history(
    State(state): State<AppState>,
    Path(sector_id): Path<i64>,
) -> AppResult<Json<SectorSalesHistory>> {
    let service = HarvestService::new(state.store);
    Ok(Json(service.sector_history(sector_id).await?))
}
