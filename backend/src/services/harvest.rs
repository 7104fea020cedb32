//! Harvest service: sales dashboards and calibre breakdowns

use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    available_years, group_by_year_and_calibre, harvest_stats, rank_clients,
    sector_sales_history, CalibreRow, Client, Harvest, HarvestFilter, HarvestStats,
    SectorSalesHistory,
};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::store::{decode_rows, Collection, Filter, RecordStore};

#[derive(Clone)]
pub struct HarvestService {
    store: Arc<dyn RecordStore>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClientRank {
    pub client: String,
    pub kilos: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct HarvestDashboard {
    pub stats: HarvestStats,
    pub top_clients: Vec<ClientRank>,
    pub available_years: Vec<i32>,
    pub harvest_count: usize,
}

impl HarvestService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Harvests with client names resolved from the clients table
    async fn load_harvests(&self, filters: &[Filter]) -> AppResult<Vec<Harvest>> {
        let rows = self.store.fetch_all(Collection::Harvests, filters).await?;
        let mut harvests: Vec<Harvest> = decode_rows(Collection::Harvests, rows);
        let clients: Vec<Client> = decode_rows(
            Collection::Clients,
            self.store.fetch_all(Collection::Clients, &[]).await?,
        );

        for harvest in &mut harvests {
            if harvest.client_name.is_none() {
                harvest.client_name = harvest
                    .client_id
                    .and_then(|id| clients.iter().find(|c| c.id == id))
                    .map(|c| c.name.clone());
            }
        }
        Ok(harvests)
    }

    /// Sales dashboard: totals, calibre shares and the top clients
    #[tracing::instrument(skip(self))]
    pub async fn dashboard(&self, filter: HarvestFilter, top_n: usize) -> AppResult<HarvestDashboard> {
        let harvests = self.load_harvests(&[]).await?;
        let selected = filter.apply(&harvests);

        let top_clients = rank_clients(selected.iter().copied(), top_n)
            .into_iter()
            .map(|(client, kilos)| ClientRank { client, kilos })
            .collect();

        Ok(HarvestDashboard {
            stats: harvest_stats(selected.iter().copied()),
            top_clients,
            available_years: available_years(&harvests),
            harvest_count: selected.len(),
        })
    }

    /// Kilos and amounts per year and calibre
    #[tracing::instrument(skip(self))]
    pub async fn calibre_rows(&self, filter: HarvestFilter) -> AppResult<Vec<CalibreRow>> {
        let harvests = self.load_harvests(&[]).await?;
        Ok(group_by_year_and_calibre(filter.apply(&harvests)))
    }

    /// Same rows as [`Self::calibre_rows`] rendered as CSV
    pub async fn calibre_csv(&self, filter: HarvestFilter) -> AppResult<String> {
        let rows = self.calibre_rows(filter).await?;
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(["year", "calibre", "kilos", "total_amount"])
            .map_err(|e| AppError::Internal(e.to_string()))?;
        for row in &rows {
            writer
                .write_record([
                    row.year.map(|y| y.to_string()).unwrap_or_default(),
                    row.calibre.clone(),
                    row.kilos.to_string(),
                    row.total_amount.to_string(),
                ])
                .map_err(|e| AppError::Internal(e.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| AppError::Internal(e.to_string()))
    }

    /// Sales history of one sector by year and calibre
    #[tracing::instrument(skip(self))]
    pub async fn sector_history(&self, sector_id: i64) -> AppResult<SectorSalesHistory> {
        if self.store.fetch_one(Collection::Sectors, sector_id).await?.is_none() {
            return Err(AppError::NotFound("Sector".to_string()));
        }
        let harvests = self
            .load_harvests(&[Filter::eq("sector_id", sector_id)])
            .await?;
        Ok(sector_sales_history(&harvests, sector_id))
    }
}
