//! WebAssembly module for the farm dashboard
//!
//! Runs the dashboard calculators in the browser so screens can recompute
//! derived values without a round trip:
//! - Stock movements and weighted average cost
//! - Irrigation demand
//! - Partner balances and movement origins
//! - Harvest calibre tables and client rankings
//! - Expense due dates
//!
//! Functions take and return JSON strings in the same shape the backend
//! serves.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shared::numeric::{lenient_decimal, lenient_opt_decimal};
use std::str::FromStr;
use wasm_bindgen::prelude::*;

pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("farm dashboard wasm ready"));
}

fn parse<T: DeserializeOwned>(label: &str, json: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| format!("Invalid {} JSON: {}", label, e))
}

fn render<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| e.to_string())
}

/// Surface a failure in the browser console and hand it to the caller
fn to_js(result: Result<String, String>) -> Result<String, JsValue> {
    result.map_err(|message| {
        web_sys::console::warn_1(&JsValue::from_str(&message));
        JsValue::from_str(&message)
    })
}

/// Current local date from the browser clock
fn browser_today() -> Option<NaiveDate> {
    let now = js_sys::Date::new_0();
    NaiveDate::from_ymd_opt(
        now.get_full_year() as i32,
        now.get_month() + 1,
        now.get_date(),
    )
}

// ============================================================================
// Warehouse
// ============================================================================

#[derive(Debug, Deserialize)]
struct MovementInput {
    kind: MovementKind,
    #[serde(default, deserialize_with = "lenient_decimal")]
    quantity: Decimal,
    #[serde(default, deserialize_with = "lenient_opt_decimal")]
    unit_cost: Option<Decimal>,
}

fn apply_stock_movement_json(position_json: &str, movement_json: &str) -> Result<String, String> {
    let position: StockPosition = parse("position", position_json)?;
    let movement: MovementInput = parse("movement", movement_json)?;
    render(&apply_movement(
        position,
        movement.kind,
        movement.quantity,
        movement.unit_cost,
    ))
}

/// Preview the stock position after an entry or exit
#[wasm_bindgen]
pub fn apply_stock_movement(position_json: &str, movement_json: &str) -> Result<String, JsValue> {
    to_js(apply_stock_movement_json(position_json, movement_json))
}

fn replay_stock_movements_json(opening_json: &str, movements_json: &str) -> Result<String, String> {
    let opening: StockPosition = parse("position", opening_json)?;
    let movements: Vec<StockMovement> = parse("movements", movements_json)?;
    render(&replay_movements(opening, &movements))
}

/// Rebuild a position from an opening balance and a movement history
#[wasm_bindgen]
pub fn replay_stock_movements(opening_json: &str, movements_json: &str) -> Result<String, JsValue> {
    to_js(replay_stock_movements_json(opening_json, movements_json))
}

// ============================================================================
// Irrigation
// ============================================================================

fn weekly_irrigation_liters_json(sector_json: &str, program_json: Option<&str>) -> Result<String, String> {
    let sector: IrrigationSector = parse("sector", sector_json)?;
    let program: Option<IrrigationProgram> = program_json
        .map(|json| parse("program", json))
        .transpose()?;
    Ok(weekly_volume_liters(&sector, program.as_ref()).to_string())
}

/// Weekly liters for a sector under an optional program, as a decimal string
#[wasm_bindgen]
pub fn weekly_irrigation_liters(sector_json: &str, program_json: Option<String>) -> Result<String, JsValue> {
    to_js(weekly_irrigation_liters_json(sector_json, program_json.as_deref()))
}

fn liters_to_cubic_meters_json(liters: &str) -> Result<String, String> {
    let liters = Decimal::from_str(liters.trim())
        .map_err(|e| format!("Invalid liters value {:?}: {}", liters, e))?;
    Ok(liters_to_cubic_meters(liters).to_string())
}

/// Convert a decimal string of liters to cubic meters
#[wasm_bindgen(js_name = liters_to_cubic_meters)]
pub fn liters_to_cubic_meters_js(liters: &str) -> Result<String, JsValue> {
    to_js(liters_to_cubic_meters_json(liters))
}

// ============================================================================
// Partners
// ============================================================================

fn aggregate_partner_ledger_json(movements_json: &str) -> Result<String, String> {
    let movements: Vec<CapitalMovement> = parse("movements", movements_json)?;
    render(&aggregate_partner_ledger(&movements))
}

/// Contributed, withdrawn and balance per partner id
#[wasm_bindgen(js_name = aggregate_partner_ledger)]
pub fn aggregate_partner_ledger_js(movements_json: &str) -> Result<String, JsValue> {
    to_js(aggregate_partner_ledger_json(movements_json))
}

fn parse_movement_origin_json(description: Option<&str>) -> String {
    let origin = parse_origin(description);
    render(&origin).unwrap_or_default()
}

/// Classify a movement description as system generated or manual
#[wasm_bindgen]
pub fn parse_movement_origin(description: Option<String>) -> String {
    parse_movement_origin_json(description.as_deref())
}

// ============================================================================
// Harvest
// ============================================================================

fn group_harvest_by_calibre_json(harvests_json: &str) -> Result<String, String> {
    let harvests: Vec<Harvest> = parse("harvests", harvests_json)?;
    render(&group_by_year_and_calibre(&harvests))
}

/// Year by calibre rows, newest year first
#[wasm_bindgen]
pub fn group_harvest_by_calibre(harvests_json: &str) -> Result<String, JsValue> {
    to_js(group_harvest_by_calibre_json(harvests_json))
}

#[derive(Serialize)]
struct RankedClient {
    client: String,
    kilos: Decimal,
}

fn rank_harvest_clients_json(harvests_json: &str, limit: usize) -> Result<String, String> {
    let harvests: Vec<Harvest> = parse("harvests", harvests_json)?;
    let ranked: Vec<RankedClient> = rank_clients(&harvests, limit)
        .into_iter()
        .map(|(client, kilos)| RankedClient { client, kilos })
        .collect();
    render(&ranked)
}

/// Clients by total kilos, largest first
#[wasm_bindgen]
pub fn rank_harvest_clients(harvests_json: &str, limit: usize) -> Result<String, JsValue> {
    to_js(rank_harvest_clients_json(harvests_json, limit))
}

// ============================================================================
// Expenses
// ============================================================================

fn next_expense_due_json(expense_json: &str, today: NaiveDate) -> Result<String, String> {
    let expense: Expense = parse("expense", expense_json)?;
    render(&next_due(&expense, today))
}

/// Next pending installment; `null` when nothing is due.
///
/// `today_iso` defaults to the browser's current date.
#[wasm_bindgen]
pub fn next_expense_due(expense_json: &str, today_iso: Option<String>) -> Result<String, JsValue> {
    let today = match today_iso {
        Some(iso) => NaiveDate::parse_from_str(&iso, "%Y-%m-%d")
            .map_err(|e| format!("Invalid date {}: {}", iso, e)),
        None => browser_today().ok_or_else(|| "Browser clock returned an invalid date".to_string()),
    };
    to_js(today.and_then(|today| next_expense_due_json(expense_json, today)))
}

fn expense_totals_json(expenses_json: &str) -> Result<String, String> {
    let expenses: Vec<Expense> = parse("expenses", expenses_json)?;
    render(&expense_totals(&expenses))
}

#[wasm_bindgen(js_name = expense_totals)]
pub fn expense_totals_js(expenses_json: &str) -> Result<String, JsValue> {
    to_js(expense_totals_json(expenses_json))
}

// ============================================================================
// Validation
// ============================================================================

/// Check a Chilean RUT such as `12.345.678-5`
#[wasm_bindgen]
pub fn validate_rut_js(rut: &str) -> bool {
    validate_rut(rut).is_ok()
}

#[wasm_bindgen]
pub fn validate_calibre_js(calibre: &str) -> bool {
    validate_calibre(calibre).is_ok()
}

/// Error message for an invalid shift duration, `None` when valid
#[wasm_bindgen]
pub fn check_shift_duration(minutes: u32) -> Option<String> {
    validate_shift_duration(minutes).err().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn as_json(text: &str) -> Value {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn test_apply_stock_movement() {
        let out = apply_stock_movement_json(
            r#"{"stock": "10", "avg_cost": "100"}"#,
            r#"{"kind": "Entrada", "quantity": 10, "unit_cost": 200}"#,
        )
        .unwrap();
        let position: StockPosition = serde_json::from_str(&out).unwrap();
        assert_eq!(position.stock, Decimal::from(20));
        assert_eq!(position.avg_cost, Decimal::from(150));
    }

    #[test]
    fn test_malformed_input_is_an_error() {
        let err = apply_stock_movement_json("{", "{}").unwrap_err();
        assert!(err.starts_with("Invalid position JSON"));
        assert!(group_harvest_by_calibre_json("[{\"id\": \"x\"}]").is_err());
    }

    #[test]
    fn test_replay_stock_movements() {
        let movements = json!([
            {"insumo_id": 1, "tipo_movimiento": "Salida", "cantidad": 5, "fecha": "2025-01-03"},
            {"insumo_id": 1, "tipo_movimiento": "Entrada", "cantidad": 10,
             "costo_unitario": 50, "fecha": "2025-01-01"}
        ]);
        let out = replay_stock_movements_json(r#"{"stock": "0", "avg_cost": "0"}"#, &movements.to_string())
            .unwrap();
        let position: StockPosition = serde_json::from_str(&out).unwrap();
        assert_eq!(position.stock, Decimal::from(5));
        assert_eq!(position.avg_cost, Decimal::from(50));
    }

    #[test]
    fn test_weekly_irrigation_liters() {
        let sector = json!({"id": 1, "cantidad_aspersores": 10, "caudal_lph": 4});
        let program = json!({"sector_id": 1, "dias": ["Lunes", "Jueves"], "turnos": [{"duracion": 60}]});
        let liters =
            weekly_irrigation_liters_json(&sector.to_string(), Some(&program.to_string())).unwrap();
        assert_eq!(liters, "80");
        assert_eq!(weekly_irrigation_liters_json(&sector.to_string(), None).unwrap(), "0");
        let cubic = liters_to_cubic_meters_json("80").unwrap();
        assert_eq!(Decimal::from_str(&cubic).unwrap(), Decimal::new(8, 2));
        let precise = liters_to_cubic_meters_json("1234567890123456789.5").unwrap();
        assert_eq!(
            Decimal::from_str(&precise).unwrap(),
            Decimal::from_str("1234567890123456.7895").unwrap()
        );
        assert!(liters_to_cubic_meters_json("ochenta").is_err());
    }

    #[test]
    fn test_partner_ledger_and_origin() {
        let movements = json!([
            {"socio_id": 4, "tipo": "Aporte", "monto": 100},
            {"socio_id": 4, "tipo": "Retiro", "monto": "30"}
        ]);
        let ledger = as_json(&aggregate_partner_ledger_json(&movements.to_string()).unwrap());
        assert_eq!(ledger["4"]["balance"], "70");

        let origin = as_json(&parse_movement_origin_json(Some("Pago Gasto: flete [GID:9]")));
        assert_eq!(origin["origin_id"], "9");
        assert_eq!(origin["is_system_generated"], true);
        let manual = as_json(&parse_movement_origin_json(None));
        assert_eq!(manual["label"], MANUAL_LABEL);
    }

    #[test]
    fn test_harvest_tables() {
        let harvests = json!([
            {"id": 1, "fecha": "2024-03-01", "cliente_id": 1, "client_name": "Sur",
             "detalle_cosechas": [{"calibre": "Segunda", "kilos": 5}, {"calibre": "Extra", "kilos": 7}]},
            {"id": 2, "fecha": "2024-04-01", "client_name": "Norte",
             "detalle_cosechas": [{"calibre": "Extra", "kilos": 20}]}
        ])
        .to_string();
        let rows = as_json(&group_harvest_by_calibre_json(&harvests).unwrap());
        assert_eq!(rows[0]["calibre"], "Extra");
        assert_eq!(rows[0]["kilos"], "27");
        assert_eq!(rows[1]["calibre"], "Segunda");

        let ranked = as_json(&rank_harvest_clients_json(&harvests, 1).unwrap());
        assert_eq!(ranked.as_array().unwrap().len(), 1);
        assert_eq!(ranked[0]["client"], "Norte");
    }

    #[test]
    fn test_next_expense_due() {
        let expense = json!({
            "id": 3, "monto": 100, "estado_pago": "Pendiente",
            "cuotas": [{"fecha_vencimiento": "2025-01-12", "estado": "Pendiente"}]
        })
        .to_string();
        let today = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let next = as_json(&next_expense_due_json(&expense, today).unwrap());
        assert_eq!(next["days_remaining"], 2);
        assert_eq!(next["urgency"], "soon");

        let paid = json!({"id": 4, "estado_pago": "Pagado"}).to_string();
        assert_eq!(next_expense_due_json(&paid, today).unwrap(), "null");
    }

    #[test]
    fn test_expense_totals() {
        let expenses = json!([
            {"id": 1, "monto": 100, "estado_pago": "Pagado"},
            {"id": 2, "monto": 40, "estado_pago": "Parcial"}
        ])
        .to_string();
        let totals = as_json(&expense_totals_json(&expenses).unwrap());
        assert_eq!(totals["pending"], "40");
        assert_eq!(totals["paid"], "100");
    }

    #[test]
    fn test_validation_wrappers() {
        assert!(validate_rut_js("12.345.678-5"));
        assert!(!validate_rut_js("12.345.678-9"));
        assert!(validate_calibre_js("Extra"));
        assert!(!validate_calibre_js(""));
        assert_eq!(check_shift_duration(90), None);
        assert!(check_shift_duration(0).is_some());
    }
}
