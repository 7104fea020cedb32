//! Harvest models, calibre grouping and client ranking

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::numeric::{
    lenient_date, lenient_decimal, lenient_opt_id, non_negative, null_as_default, ratio_or_zero,
    saturating_sum,
};

/// Canonical calibre ranking, best grade first
pub const CALIBRE_ORDER: [&str; 8] = [
    "Extra", "Primera", "Segunda", "Tercera", "Cuarta", "Quinta", "Descarte", "Desecho",
];

/// Destination value for harvests that were sold
pub const SALE_DESTINATION: &str = "Venta";
pub const UNKNOWN_CLIENT: &str = "Unknown";
pub const NO_CALIBRE: &str = "No Calibre";

/// Position of a calibre in the canonical order; unknown calibres rank last
pub fn calibre_rank(calibre: &str) -> usize {
    CALIBRE_ORDER
        .iter()
        .position(|c| *c == calibre)
        .unwrap_or(CALIBRE_ORDER.len())
}

/// A harvest delivery (cosecha) with its per-calibre detail lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Harvest {
    pub id: i64,
    #[serde(default, alias = "fecha", deserialize_with = "lenient_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, alias = "destino")]
    pub destination: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_id")]
    pub sector_id: Option<i64>,
    #[serde(default, alias = "cliente_id", deserialize_with = "lenient_opt_id")]
    pub client_id: Option<i64>,
    /// Resolved by the data-access layer from the clients collection
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default, alias = "detalle_cosechas", deserialize_with = "null_as_default")]
    pub details: Vec<HarvestDetail>,
}

/// A buyer of harvested fruit (cliente)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    #[serde(default, alias = "nombre")]
    pub name: String,
}

impl Harvest {
    pub fn year(&self) -> Option<i32> {
        self.date.map(|d| d.year())
    }

    pub fn is_sale(&self) -> bool {
        self.destination.as_deref() == Some(SALE_DESTINATION)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestDetail {
    #[serde(default, alias = "cosecha_id", deserialize_with = "lenient_opt_id")]
    pub harvest_id: Option<i64>,
    #[serde(default)]
    pub calibre: Option<String>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub kilos: Decimal,
    #[serde(default, alias = "precio_kilo", deserialize_with = "lenient_decimal")]
    pub price_per_kilo: Decimal,
}

impl HarvestDetail {
    pub fn kilos(&self) -> Decimal {
        non_negative(self.kilos)
    }

    pub fn amount(&self) -> Decimal {
        self.kilos().saturating_mul(non_negative(self.price_per_kilo))
    }

    pub fn calibre_name(&self) -> &str {
        match self.calibre.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => c,
            _ => NO_CALIBRE,
        }
    }
}

/// One row of the year x calibre sales table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalibreRow {
    /// `None` when the harvest has no date
    pub year: Option<i32>,
    pub calibre: String,
    pub kilos: Decimal,
    pub total_amount: Decimal,
}

/// Group detail lines by (year, calibre), newest year first then canonical
/// calibre order. Rows that tie keep first-seen order.
pub fn group_by_year_and_calibre<'a>(
    harvests: impl IntoIterator<Item = &'a Harvest>,
) -> Vec<CalibreRow> {
    let mut rows: Vec<CalibreRow> = Vec::new();
    let mut index: HashMap<(Option<i32>, String), usize> = HashMap::new();

    for harvest in harvests {
        let year = harvest.year();
        for detail in &harvest.details {
            let calibre = detail.calibre_name().to_string();
            let slot = *index.entry((year, calibre.clone())).or_insert_with(|| {
                rows.push(CalibreRow {
                    year,
                    calibre,
                    kilos: Decimal::ZERO,
                    total_amount: Decimal::ZERO,
                });
                rows.len() - 1
            });
            let row = &mut rows[slot];
            row.kilos = row.kilos.saturating_add(detail.kilos());
            row.total_amount = row.total_amount.saturating_add(detail.amount());
        }
    }

    // Stable sort; `None < Some`, so undated rows end up last
    rows.sort_by(|a, b| {
        b.year
            .cmp(&a.year)
            .then_with(|| calibre_rank(&a.calibre).cmp(&calibre_rank(&b.calibre)))
    });
    rows
}

/// Total kilos per client, largest first, truncated to `limit`
pub fn rank_clients<'a>(
    harvests: impl IntoIterator<Item = &'a Harvest>,
    limit: usize,
) -> Vec<(String, Decimal)> {
    let mut totals: HashMap<String, Decimal> = HashMap::new();
    for harvest in harvests {
        let name = harvest
            .client_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(UNKNOWN_CLIENT);
        let kilos = saturating_sum(harvest.details.iter().map(HarvestDetail::kilos));
        let total = totals.entry(name.to_string()).or_insert(Decimal::ZERO);
        *total = total.saturating_add(kilos);
    }

    let mut ranked: Vec<(String, Decimal)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

/// Dashboard filters; `None` means "all"
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarvestFilter {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub sector_id: Option<i64>,
    pub client_id: Option<i64>,
}

impl HarvestFilter {
    pub fn matches(&self, harvest: &Harvest) -> bool {
        if self.year.is_some() || self.month.is_some() {
            let Some(date) = harvest.date else {
                return false;
            };
            if self.year.is_some_and(|y| y != date.year()) {
                return false;
            }
            if self.month.is_some_and(|m| m != date.month()) {
                return false;
            }
        }
        if self.sector_id.is_some() && self.sector_id != harvest.sector_id {
            return false;
        }
        if self.client_id.is_some() && self.client_id != harvest.client_id {
            return false;
        }
        true
    }

    pub fn apply<'a>(&self, harvests: &'a [Harvest]) -> Vec<&'a Harvest> {
        harvests.iter().filter(|h| self.matches(h)).collect()
    }
}

/// Per-calibre bar of the harvest dashboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalibreShare {
    pub calibre: String,
    pub kilos: Decimal,
    pub revenue: Decimal,
    pub avg_price: Decimal,
    /// Share of total kilos, 0-100
    pub percentage: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HarvestStats {
    pub total_kilos: Decimal,
    pub total_revenue: Decimal,
    pub avg_price: Decimal,
    pub by_calibre: Vec<CalibreShare>,
}

/// Headline numbers and calibre breakdown for a set of harvests
pub fn harvest_stats<'a>(harvests: impl IntoIterator<Item = &'a Harvest>) -> HarvestStats {
    let mut stats = HarvestStats::default();
    let mut calibres: Vec<CalibreShare> = Vec::new();

    for harvest in harvests {
        for detail in &harvest.details {
            let kilos = detail.kilos();
            let amount = detail.amount();
            stats.total_kilos = stats.total_kilos.saturating_add(kilos);
            stats.total_revenue = stats.total_revenue.saturating_add(amount);

            let name = detail.calibre_name();
            match calibres.iter_mut().find(|c| c.calibre == name) {
                Some(share) => {
                    share.kilos = share.kilos.saturating_add(kilos);
                    share.revenue = share.revenue.saturating_add(amount);
                }
                None => calibres.push(CalibreShare {
                    calibre: name.to_string(),
                    kilos,
                    revenue: amount,
                    avg_price: Decimal::ZERO,
                    percentage: Decimal::ZERO,
                }),
            }
        }
    }

    for share in &mut calibres {
        share.avg_price = ratio_or_zero(share.revenue, share.kilos);
        share.percentage = ratio_or_zero(
            share.kilos.saturating_mul(Decimal::from(100)),
            stats.total_kilos,
        );
    }
    calibres.sort_by_key(|c| calibre_rank(&c.calibre));

    stats.avg_price = ratio_or_zero(stats.total_revenue, stats.total_kilos);
    stats.by_calibre = calibres;
    stats
}

/// Distinct harvest years, newest first
pub fn available_years(harvests: &[Harvest]) -> Vec<i32> {
    let mut years: Vec<i32> = harvests.iter().filter_map(Harvest::year).collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();
    years
}

/// Sales history table on the sector detail screen
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SectorSalesHistory {
    pub rows: Vec<CalibreRow>,
    pub total_kilos: Decimal,
    pub total_amount: Decimal,
}

pub fn sector_sales_history(harvests: &[Harvest], sector_id: i64) -> SectorSalesHistory {
    let sold = harvests
        .iter()
        .filter(|h| h.sector_id == Some(sector_id) && h.is_sale());
    let rows = group_by_year_and_calibre(sold);
    let total_kilos = saturating_sum(rows.iter().map(|r| r.kilos));
    let total_amount = saturating_sum(rows.iter().map(|r| r.total_amount));
    SectorSalesHistory {
        rows,
        total_kilos,
        total_amount,
    }
}
