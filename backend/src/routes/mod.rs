//! Route definitions for the farm dashboard API

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/inventory", inventory_routes())
        .nest("/irrigation", irrigation_routes())
        .nest("/partners", partner_routes())
        .nest("/harvests", harvest_routes())
        .route(
            "/sectors/:sector_id/harvest-history",
            get(handlers::get_sector_harvest_history),
        )
        .nest("/expenses", expense_routes())
}

/// Warehouse routes
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/items", get(handlers::list_items))
        .route("/items/:item_id/replay", get(handlers::replay_item))
        .route("/alerts", get(handlers::list_stock_alerts))
        .route("/movements", post(handlers::record_stock_movement))
}

/// Irrigation routes
fn irrigation_routes() -> Router<AppState> {
    Router::new()
        .route("/sectors", get(handlers::list_sector_demand))
        .route("/fields", get(handlers::list_field_summaries))
        .route("/history", get(handlers::list_program_history))
}

/// Partner account routes
fn partner_routes() -> Router<AppState> {
    Router::new()
        .route("/balances", get(handlers::list_partner_balances))
        .route(
            "/movements",
            get(handlers::list_capital_movements).post(handlers::record_capital_movement),
        )
        .route("/movements/:movement_id", delete(handlers::delete_capital_movement))
}

/// Harvest dashboard routes
fn harvest_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(handlers::get_harvest_dashboard))
        .route("/calibres", get(handlers::list_calibre_rows))
        .route("/calibres.csv", get(handlers::export_calibre_csv))
}

/// Expense routes
fn expense_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_expenses))
        .route("/summary", get(handlers::get_expense_summary))
        .route("/upcoming", get(handlers::list_upcoming_expenses))
}
