//! Irrigation sector configuration, weekly programs and water demand

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::numeric::{
    lenient_date, lenient_decimal, lenient_opt_id, lenient_u32, non_negative, null_as_default,
};

/// A field (parcela) grouping several sectors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub id: i64,
    #[serde(default, alias = "nombre")]
    pub name: String,
}

/// Group header used for sectors without a field
pub const UNASSIGNED_FIELD: &str = "Unassigned Field";

/// An irrigated sector inside a field (parcela)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrrigationSector {
    pub id: i64,
    #[serde(default, alias = "nombre")]
    pub name: String,
    #[serde(default, alias = "parcela_id", deserialize_with = "lenient_opt_id")]
    pub field_id: Option<i64>,
    #[serde(default, alias = "cantidad_aspersores", deserialize_with = "lenient_decimal")]
    pub emitter_count: Decimal,
    #[serde(default, alias = "caudal_lph", deserialize_with = "lenient_decimal")]
    pub emitter_flow_lph: Decimal,
    #[serde(default, alias = "cantidad_arboles", deserialize_with = "lenient_decimal")]
    pub tree_count: Decimal,
    #[serde(default, alias = "superficie_ha", deserialize_with = "lenient_decimal")]
    pub area_ha: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Weekday {
    #[serde(alias = "Lunes")]
    Monday,
    #[serde(alias = "Martes")]
    Tuesday,
    #[serde(alias = "Miércoles", alias = "Miercoles")]
    Wednesday,
    #[serde(alias = "Jueves")]
    Thursday,
    #[serde(alias = "Viernes")]
    Friday,
    #[serde(alias = "Sábado", alias = "Sabado")]
    Saturday,
    #[serde(alias = "Domingo")]
    Sunday,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProgramStatus {
    #[default]
    #[serde(alias = "Activo")]
    Active,
    #[serde(alias = "Finalizado")]
    Finished,
    #[serde(other)]
    Unknown,
}

/// One irrigation turn within a program day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shift {
    #[serde(default, alias = "hora")]
    pub start_time: Option<String>,
    #[serde(default, alias = "duracion", deserialize_with = "lenient_u32")]
    pub duration_min: u32,
    /// Untagged shifts apply to every sector of the program
    #[serde(default, deserialize_with = "lenient_opt_id")]
    pub sector_id: Option<i64>,
}

impl Shift {
    pub fn applies_to(&self, sector_id: i64) -> bool {
        self.sector_id.map_or(true, |id| id == sector_id)
    }
}

/// A weekly irrigation program covering one or more sectors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrrigationProgram {
    #[serde(default, deserialize_with = "lenient_opt_id")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_id")]
    pub sector_id: Option<i64>,
    #[serde(default, alias = "sectores_ids", deserialize_with = "null_as_default")]
    pub sector_ids: Vec<i64>,
    #[serde(default, alias = "dias", deserialize_with = "null_as_default")]
    pub active_days: Vec<Weekday>,
    #[serde(default, alias = "turnos", deserialize_with = "null_as_default")]
    pub shifts: Vec<Shift>,
    #[serde(default, alias = "estado", deserialize_with = "null_as_default")]
    pub status: ProgramStatus,
    #[serde(default, alias = "fecha_creacion", deserialize_with = "lenient_date")]
    pub created_on: Option<NaiveDate>,
}

impl IrrigationProgram {
    pub fn is_active(&self) -> bool {
        self.status != ProgramStatus::Finished
    }

    pub fn covers(&self, sector_id: i64) -> bool {
        self.sector_id == Some(sector_id) || self.sector_ids.contains(&sector_id)
    }

    /// Distinct recognized weekdays, at most seven
    pub fn days_per_week(&self) -> u64 {
        let mut days: Vec<Weekday> = self
            .active_days
            .iter()
            .copied()
            .filter(|d| *d != Weekday::Unknown)
            .collect();
        days.sort();
        days.dedup();
        days.len() as u64
    }

    /// Irrigation minutes per program day for the given sector
    pub fn minutes_per_day(&self, sector_id: i64) -> u64 {
        self.shifts
            .iter()
            .filter(|s| s.applies_to(sector_id))
            .map(|s| u64::from(s.duration_min))
            .sum()
    }
}

/// Combined flow of all emitters in a sector, in liters per hour
pub fn sector_flow_lph(sector: &IrrigationSector) -> Decimal {
    non_negative(sector.emitter_count).saturating_mul(non_negative(sector.emitter_flow_lph))
}

/// Liters delivered by a sector's emitters running for `duration_min`
pub fn shift_volume_liters(flow_lph: Decimal, duration_min: u64) -> Decimal {
    // Multiply before dividing so whole-liter results stay exact
    flow_lph.saturating_mul(Decimal::from(duration_min)) / Decimal::from(60)
}

/// Weekly water demand of a sector under a program, in liters.
///
/// A missing or finished program means zero demand.
pub fn weekly_volume_liters(sector: &IrrigationSector, program: Option<&IrrigationProgram>) -> Decimal {
    let Some(program) = program.filter(|p| p.is_active()) else {
        return Decimal::ZERO;
    };
    let minutes_per_week = program
        .minutes_per_day(sector.id)
        .saturating_mul(program.days_per_week());
    shift_volume_liters(sector_flow_lph(sector), minutes_per_week)
}

/// Water demand on a single program day, in liters
pub fn daily_volume_liters(sector: &IrrigationSector, program: Option<&IrrigationProgram>) -> Decimal {
    let Some(program) = program.filter(|p| p.is_active()) else {
        return Decimal::ZERO;
    };
    shift_volume_liters(sector_flow_lph(sector), program.minutes_per_day(sector.id))
}

pub fn liters_to_cubic_meters(liters: Decimal) -> Decimal {
    liters / Decimal::from(1000)
}

/// First non-finished program that covers the sector
pub fn active_program_for(sector_id: i64, programs: &[IrrigationProgram]) -> Option<&IrrigationProgram> {
    programs
        .iter()
        .find(|p| p.is_active() && p.covers(sector_id))
}

/// Totals shown on a field card of the field configuration screen
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FieldSummary {
    pub sector_count: usize,
    pub tree_count: Decimal,
    pub area_ha: Decimal,
    pub emitter_count: Decimal,
    pub flow_lph: Decimal,
    pub flow_m3h: Decimal,
}

pub fn summarize_field<'a>(sectors: impl IntoIterator<Item = &'a IrrigationSector>) -> FieldSummary {
    let mut summary = FieldSummary::default();
    for sector in sectors {
        summary.sector_count += 1;
        summary.tree_count = summary.tree_count.saturating_add(non_negative(sector.tree_count));
        summary.area_ha = summary.area_ha.saturating_add(non_negative(sector.area_ha));
        summary.emitter_count = summary
            .emitter_count
            .saturating_add(non_negative(sector.emitter_count));
        summary.flow_lph = summary.flow_lph.saturating_add(sector_flow_lph(sector));
    }
    summary.flow_m3h = liters_to_cubic_meters(summary.flow_lph);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sector(id: i64, emitters: i64, flow: i64) -> IrrigationSector {
        IrrigationSector {
            id,
            name: format!("S{}", id),
            field_id: Some(1),
            emitter_count: Decimal::from(emitters),
            emitter_flow_lph: Decimal::from(flow),
            tree_count: Decimal::from(100),
            area_ha: Decimal::new(15, 1),
        }
    }

    fn program(days: &[Weekday], shifts: Vec<Shift>) -> IrrigationProgram {
        IrrigationProgram {
            id: Some(1),
            sector_id: Some(1),
            sector_ids: vec![],
            active_days: days.to_vec(),
            shifts,
            status: ProgramStatus::Active,
            created_on: None,
        }
    }

    #[test]
    fn test_oversized_sector_saturates() {
        let mut big = sector(1, 1, 1);
        big.emitter_count = Decimal::MAX;
        big.emitter_flow_lph = Decimal::from(4);
        big.tree_count = Decimal::MAX;
        assert_eq!(sector_flow_lph(&big), Decimal::MAX);

        let p = program(&[Weekday::Monday], vec![shift(1440, None)]);
        assert_eq!(
            weekly_volume_liters(&big, Some(&p)),
            Decimal::MAX / Decimal::from(60)
        );

        let summary = summarize_field([&big, &big]);
        assert_eq!(summary.tree_count, Decimal::MAX);
        assert_eq!(summary.flow_lph, Decimal::MAX);
    }

    fn shift(minutes: u32, sector_id: Option<i64>) -> Shift {
        Shift {
            start_time: Some("08:00".into()),
            duration_min: minutes,
            sector_id,
        }
    }

    #[test]
    fn test_weekly_volume_example() {
        let s = sector(1, 10, 4);
        let p = program(&[Weekday::Monday, Weekday::Thursday], vec![shift(60, None)]);
        assert_eq!(sector_flow_lph(&s), Decimal::from(40));
        assert_eq!(weekly_volume_liters(&s, Some(&p)), Decimal::from(80));
        assert_eq!(daily_volume_liters(&s, Some(&p)), Decimal::from(40));
    }

    #[test]
    fn test_no_program_is_zero() {
        let s = sector(1, 10, 4);
        assert_eq!(weekly_volume_liters(&s, None), Decimal::ZERO);
        assert_eq!(daily_volume_liters(&s, None), Decimal::ZERO);
    }

    #[test]
    fn test_finished_program_is_zero() {
        let s = sector(1, 10, 4);
        let mut p = program(&[Weekday::Monday], vec![shift(60, None)]);
        p.status = ProgramStatus::Finished;
        assert_eq!(weekly_volume_liters(&s, Some(&p)), Decimal::ZERO);
    }

    #[test]
    fn test_shifts_tagged_for_other_sectors_are_ignored() {
        let s = sector(2, 10, 6);
        let p = program(
            &[Weekday::Monday],
            vec![shift(30, Some(2)), shift(90, Some(3)), shift(30, None)],
        );
        // 60 L/h over 60 minutes
        assert_eq!(weekly_volume_liters(&s, Some(&p)), Decimal::from(60));
    }

    #[test]
    fn test_duplicate_and_unknown_days_counted_once() {
        let p = program(
            &[Weekday::Monday, Weekday::Monday, Weekday::Unknown, Weekday::Friday],
            vec![],
        );
        assert_eq!(p.days_per_week(), 2);
    }

    #[test]
    fn test_program_decodes_backend_row() {
        let p: IrrigationProgram = serde_json::from_value(json!({
            "id": 4,
            "sector_id": "7",
            "dias": ["Lunes", "Miércoles", "Viernes"],
            "turnos": [{"hora": "08:00", "duracion": "45", "sector_id": 7}, {"hora": "18:00", "duracion": 15}],
            "estado": "Activo"
        }))
        .unwrap();
        assert!(p.is_active());
        assert!(p.covers(7));
        assert_eq!(p.days_per_week(), 3);
        assert_eq!(p.minutes_per_day(7), 60);
        assert_eq!(p.minutes_per_day(8), 15);
    }

    #[test]
    fn test_active_program_lookup() {
        let mut finished = program(&[Weekday::Monday], vec![]);
        finished.status = ProgramStatus::Finished;
        let mut multi = program(&[Weekday::Monday], vec![]);
        multi.id = Some(2);
        multi.sector_id = None;
        multi.sector_ids = vec![1, 5];

        let programs = vec![finished, multi];
        assert_eq!(active_program_for(1, &programs).and_then(|p| p.id), Some(2));
        assert_eq!(active_program_for(5, &programs).and_then(|p| p.id), Some(2));
        assert!(active_program_for(9, &programs).is_none());
    }

    #[test]
    fn test_negative_configuration_counts_as_zero() {
        let s = sector(1, -10, 4);
        assert_eq!(sector_flow_lph(&s), Decimal::ZERO);
    }

    #[test]
    fn test_field_summary() {
        let sectors = vec![sector(1, 100, 35), sector(2, 50, 70)];
        let summary = summarize_field(&sectors);
        assert_eq!(summary.sector_count, 2);
        assert_eq!(summary.flow_lph, Decimal::from(7000));
        assert_eq!(summary.flow_m3h, Decimal::from(7));
        assert_eq!(summary.area_ha, Decimal::from(3));
        assert_eq!(summary.tree_count, Decimal::from(200));
    }

    #[test]
    fn test_cubic_meters() {
        assert_eq!(liters_to_cubic_meters(Decimal::from(2500)), Decimal::new(25, 1));
    }
}
