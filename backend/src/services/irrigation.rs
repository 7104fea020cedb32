//! Irrigation service: water demand per sector and field summaries

use chrono::Datelike;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::numeric::saturating_sum;
use shared::{
    active_program_for, daily_volume_liters, liters_to_cubic_meters, sector_flow_lph,
    summarize_field, weekly_volume_liters, Field, FieldSummary, IrrigationProgram,
    IrrigationSector, ProgramStatus, UNASSIGNED_FIELD,
};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::AppResult;
use crate::store::{decode_rows, Collection, RecordStore};

#[derive(Clone)]
pub struct IrrigationService {
    store: Arc<dyn RecordStore>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectorDemand {
    pub sector_id: i64,
    pub name: String,
    pub flow_lph: Decimal,
    pub active_program_id: Option<i64>,
    pub daily_liters: Decimal,
    pub weekly_liters: Decimal,
    pub weekly_m3: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldSectors {
    pub field_id: Option<i64>,
    pub field_name: String,
    pub sectors: Vec<SectorDemand>,
    pub weekly_liters: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldSummaryView {
    pub field_id: Option<i64>,
    pub field_name: String,
    #[serde(flatten)]
    pub summary: FieldSummary,
}

struct Snapshot {
    fields: Vec<Field>,
    sectors: Vec<IrrigationSector>,
    programs: Vec<IrrigationProgram>,
}

impl Snapshot {
    fn field_name(&self, field_id: Option<i64>) -> String {
        field_id
            .and_then(|id| self.fields.iter().find(|f| f.id == id))
            .map(|f| f.name.clone())
            .unwrap_or_else(|| UNASSIGNED_FIELD.to_string())
    }

    /// Sectors grouped by field id; unassigned sectors share the `None` key
    fn sectors_by_field(&self) -> BTreeMap<Option<i64>, Vec<&IrrigationSector>> {
        let known: Vec<i64> = self.fields.iter().map(|f| f.id).collect();
        let mut groups: BTreeMap<Option<i64>, Vec<&IrrigationSector>> = BTreeMap::new();
        for sector in &self.sectors {
            let key = sector.field_id.filter(|id| known.contains(id));
            groups.entry(key).or_default().push(sector);
        }
        groups
    }
}

impl IrrigationService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    async fn snapshot(&self) -> AppResult<Snapshot> {
        let fields = decode_rows(Collection::Fields, self.store.fetch_all(Collection::Fields, &[]).await?);
        let sectors = decode_rows(Collection::Sectors, self.store.fetch_all(Collection::Sectors, &[]).await?);
        let programs = decode_rows(
            Collection::IrrigationPrograms,
            self.store.fetch_all(Collection::IrrigationPrograms, &[]).await?,
        );
        Ok(Snapshot {
            fields,
            sectors,
            programs,
        })
    }

    /// Per-sector water demand under the active program, grouped by field
    #[tracing::instrument(skip(self))]
    pub async fn sector_demand(&self) -> AppResult<Vec<FieldSectors>> {
        let snapshot = self.snapshot().await?;

        let mut groups: Vec<FieldSectors> = snapshot
            .sectors_by_field()
            .into_iter()
            .map(|(field_id, sectors)| {
                let sectors: Vec<SectorDemand> = sectors
                    .into_iter()
                    .map(|sector| {
                        let program = active_program_for(sector.id, &snapshot.programs);
                        let weekly = weekly_volume_liters(sector, program);
                        SectorDemand {
                            sector_id: sector.id,
                            name: sector.name.clone(),
                            flow_lph: sector_flow_lph(sector),
                            active_program_id: program.and_then(|p| p.id),
                            daily_liters: daily_volume_liters(sector, program),
                            weekly_liters: weekly,
                            weekly_m3: liters_to_cubic_meters(weekly),
                        }
                    })
                    .collect();
                FieldSectors {
                    field_id,
                    field_name: snapshot.field_name(field_id),
                    weekly_liters: saturating_sum(sectors.iter().map(|s| s.weekly_liters)),
                    sectors,
                }
            })
            .collect();

        // Named fields alphabetically, the unassigned group last
        groups.sort_by(|a, b| {
            a.field_id
                .is_none()
                .cmp(&b.field_id.is_none())
                .then_with(|| a.field_name.cmp(&b.field_name))
        });
        tracing::debug!(fields = groups.len(), "Computed irrigation demand");
        Ok(groups)
    }

    /// Totals per field for the field configuration screen
    #[tracing::instrument(skip(self))]
    pub async fn field_summaries(&self) -> AppResult<Vec<FieldSummaryView>> {
        let snapshot = self.snapshot().await?;
        let groups = snapshot.sectors_by_field();

        let mut views: Vec<FieldSummaryView> = snapshot
            .fields
            .iter()
            .map(|field| FieldSummaryView {
                field_id: Some(field.id),
                field_name: field.name.clone(),
                summary: summarize_field(
                    groups.get(&Some(field.id)).into_iter().flatten().copied(),
                ),
            })
            .collect();
        views.sort_by(|a, b| a.field_name.cmp(&b.field_name));

        if let Some(unassigned) = groups.get(&None) {
            views.push(FieldSummaryView {
                field_id: None,
                field_name: UNASSIGNED_FIELD.to_string(),
                summary: summarize_field(unassigned.iter().copied()),
            });
        }
        Ok(views)
    }

    /// Finished programs, newest first, optionally limited to a creation year
    #[tracing::instrument(skip(self))]
    pub async fn program_history(&self, year: Option<i32>) -> AppResult<Vec<IrrigationProgram>> {
        let rows = self.store.fetch_all(Collection::IrrigationPrograms, &[]).await?;
        let mut programs: Vec<IrrigationProgram> =
            decode_rows::<IrrigationProgram>(Collection::IrrigationPrograms, rows)
            .into_iter()
            .filter(|p| p.status == ProgramStatus::Finished)
            .filter(|p| match year {
                Some(y) => p.created_on.map(|d| d.year()) == Some(y),
                None => true,
            })
            .collect();
        programs.sort_by(|a, b| b.created_on.cmp(&a.created_on));
        Ok(programs)
    }
}
