//! Harvest dashboard tests
//!
//! Tests for harvest grouping and ranking including:
//! - Property 6: Calibre ordering is total and stable
//! - Client ranking and calibre export

use farm_dashboard_backend::error::AppError;
use farm_dashboard_backend::services::harvest::HarvestService;
use farm_dashboard_backend::store::{Collection, MemoryStore};
use proptest::prelude::*;
use rust_decimal::Decimal;
use serde_json::json;
use shared::{
    calibre_rank, group_by_year_and_calibre, Harvest, HarvestDetail, HarvestFilter,
    CALIBRE_ORDER, UNKNOWN_CLIENT,
};
use std::sync::Arc;

fn harvest(id: i64, date: &str, calibres: &[(&str, i64)]) -> Harvest {
    Harvest {
        id,
        date: chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").ok(),
        destination: Some("Venta".to_string()),
        sector_id: None,
        client_id: None,
        client_name: None,
        details: calibres
            .iter()
            .map(|(c, kilos)| HarvestDetail {
                harvest_id: Some(id),
                calibre: Some(c.to_string()),
                kilos: Decimal::from(*kilos),
                price_per_kilo: Decimal::ONE,
            })
            .collect(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Known calibres in canonical order, unknown ones after
    #[test]
    fn test_reference_ordering() {
        let h = harvest(1, "2024-02-01", &[("Segunda", 1), ("Extra", 1), ("Mystery", 1)]);
        let rows = group_by_year_and_calibre([&h]);
        let order: Vec<&str> = rows.iter().map(|r| r.calibre.as_str()).collect();
        assert_eq!(order, vec!["Extra", "Segunda", "Mystery"]);
    }

    /// Years newest first, calibre order within a year
    #[test]
    fn test_years_descending() {
        let a = harvest(1, "2023-05-01", &[("Primera", 10)]);
        let b = harvest(2, "2024-05-01", &[("Segunda", 5), ("Extra", 7)]);
        let c = harvest(3, "2024-06-01", &[("Extra", 3)]);
        let rows = group_by_year_and_calibre([&a, &b, &c]);
        assert_eq!(rows.len(), 3);
        assert_eq!((rows[0].year, rows[0].calibre.as_str()), (Some(2024), "Extra"));
        assert_eq!(rows[0].kilos, Decimal::from(10));
        assert_eq!((rows[2].year, rows[2].calibre.as_str()), (Some(2023), "Primera"));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn calibre_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            prop::sample::select(CALIBRE_ORDER.to_vec()).prop_map(str::to_string),
            "[A-Z][a-z]{2,8}",
        ]
    }

    proptest! {
        /// Property 6: rows are sorted by year then rank, unknowns keep first-seen order
        #[test]
        fn prop_calibre_order_total_and_stable(
            calibres in prop::collection::vec(calibre_strategy(), 1..30)
        ) {
            let details: Vec<(&str, i64)> = calibres.iter().map(|c| (c.as_str(), 1)).collect();
            let h = harvest(1, "2024-01-01", &details);
            let rows = group_by_year_and_calibre([&h]);

            for pair in rows.windows(2) {
                prop_assert!(calibre_rank(&pair[0].calibre) <= calibre_rank(&pair[1].calibre));
            }

            // Unknown calibres appear in the order they were first seen
            let mut first_seen: Vec<&str> = Vec::new();
            for c in &calibres {
                if calibre_rank(c) == CALIBRE_ORDER.len() && !first_seen.contains(&c.as_str()) {
                    first_seen.push(c);
                }
            }
            let unknown_rows: Vec<&str> = rows
                .iter()
                .map(|r| r.calibre.as_str())
                .filter(|c| calibre_rank(c) == CALIBRE_ORDER.len())
                .collect();
            prop_assert_eq!(unknown_rows, first_seen);

            let total: Decimal = rows.iter().map(|r| r.kilos).sum();
            prop_assert_eq!(total, Decimal::from(calibres.len() as i64));
        }
    }
}

// ============================================================================
// Service Tests
// ============================================================================

#[cfg(test)]
mod service_tests {
    use super::*;

    async fn seeded_service() -> HarvestService {
        let store = Arc::new(MemoryStore::new());
        store
            .seed(
                Collection::Clients,
                vec![json!({"id": 1, "nombre": "Frutícola Sur"}), json!({"id": 2, "nombre": "Exportadora"})],
            )
            .await;
        store.seed(Collection::Sectors, vec![json!({"id": 5, "nombre": "S5"})]).await;
        store
            .seed(
                Collection::Harvests,
                vec![
                    json!({"id": 1, "fecha": "2024-03-10", "destino": "Venta", "sector_id": 5,
                           "cliente_id": 1, "detalle_cosechas": [
                               {"calibre": "Extra", "kilos": 100, "precio_kilo": "2.5"},
                               {"calibre": "Primera", "kilos": "50", "precio_kilo": 2}]}),
                    json!({"id": 2, "fecha": "2024-04-02", "destino": "Venta", "sector_id": 5,
                           "cliente_id": 2, "detalle_cosechas": [
                               {"calibre": "Extra", "kilos": 300, "precio_kilo": 3}]}),
                    json!({"id": 3, "fecha": "2023-11-20", "destino": "Consumo", "sector_id": 5,
                           "detalle_cosechas": [{"calibre": null, "kilos": 20, "precio_kilo": 0}]}),
                    json!({"id": 4, "fecha": "2024-03-15", "destino": "Venta", "sector_id": 6,
                           "cliente_id": 44, "detalle_cosechas": null}),
                ],
            )
            .await;
        HarvestService::new(store)
    }

    #[tokio::test]
    async fn test_dashboard_stats_and_ranking() {
        let service = seeded_service().await;
        let filter = HarvestFilter {
            year: Some(2024),
            ..Default::default()
        };
        let dashboard = service.dashboard(filter, 8).await.unwrap();

        assert_eq!(dashboard.harvest_count, 3);
        assert_eq!(dashboard.stats.total_kilos, Decimal::from(450));
        assert_eq!(dashboard.stats.total_revenue, Decimal::from(1250));
        assert_eq!(dashboard.top_clients[0].client, "Exportadora");
        assert_eq!(dashboard.top_clients[1].client, "Frutícola Sur");
        assert_eq!(dashboard.top_clients[1].kilos, Decimal::from(150));
        assert_eq!(dashboard.top_clients[2].client, UNKNOWN_CLIENT);
        assert_eq!(dashboard.available_years, vec![2024, 2023]);

        let top_one = service.dashboard(HarvestFilter::default(), 1).await.unwrap();
        assert_eq!(top_one.top_clients.len(), 1);
    }

    #[tokio::test]
    async fn test_calibre_csv() {
        let service = seeded_service().await;
        let csv = service.calibre_csv(HarvestFilter::default()).await.unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "year,calibre,kilos,total_amount");
        assert!(lines[1].starts_with("2024,Extra,400,"));
        assert!(lines.iter().any(|l| l.starts_with("2023,No Calibre,20")));
    }

    #[tokio::test]
    async fn test_sector_history_counts_sales_only() {
        let service = seeded_service().await;
        let history = service.sector_history(5).await.unwrap();
        assert_eq!(history.total_kilos, Decimal::from(450));
        assert!(history.rows.iter().all(|r| r.year == Some(2024)));

        let missing = service.sector_history(6).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }
}
