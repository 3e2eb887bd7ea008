//! Interconnection application rows: raw table parsing and the cleaned record type.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;

use super::jurisdiction::Jurisdiction;
use super::missing::{add_present, non_nan};
use crate::error::{PipelineError, PipelineResult};

/// Number of inverter and generator quantity slots per application.
pub const SLOT_COUNT: usize = 5;

const APP_ID: &str = "Application Id";
const UTILITY: &str = "Utility";
const STATUS: &str = "Application Status";
const RECEIVED: &str = "App Received Date";
const COMPLETED: &str = "App Complete Date";
const SELF_INSTALLER: &str = "Self Installer";
const INSTALLER: &str = "Installer Name";
const SIZE_DC: &str = "System Size DC";
const SIZE_AC: &str = "System Size AC";
const INVERTER_PREFIX: &str = "Inverter Quantity";
const GENERATOR_PREFIX: &str = "Generator Quantity";

/// One application row as it appears in the source table, before cleaning.
///
/// Dates stay as text so the cleaner can reject the whole load on a bad value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawApplication {
    pub app_id: String,
    pub utility: String,
    pub status: String,
    pub date_received: String,
    pub date_completed: String,
    pub self_installer: String,
    pub installer: String,
    pub size_dc: Option<f64>,
    pub size_ac: Option<f64>,
    pub inverter_slots: [Option<f64>; SLOT_COUNT],
    pub generator_slots: [Option<f64>; SLOT_COUNT],
}

/// Raw rows of one source file.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Identifies the source in error messages (usually the file path).
    pub source_name: String,
    pub rows: Vec<RawApplication>,
}

/// A filtered, enriched application.
#[derive(Debug, Clone, PartialEq)]
pub struct Application {
    pub app_id: String,
    pub jurisdiction: Jurisdiction,
    pub status: String,
    pub installer: String,
    pub date_received: NaiveDate,
    pub date_completed: Option<NaiveDate>,
    pub is_self_install: bool,
    /// System size, kW DC.
    pub size_dc: Option<f64>,
    /// System size, kW AC.
    pub size_ac: Option<f64>,
    pub inverter_qty: Option<f64>,
    pub generator_qty: Option<f64>,
    /// Subsidy in effect on the receipt date, $/W.
    pub subsidy_per_watt: f64,
    pub receipt_month: NaiveDate,
    pub completion_month: Option<NaiveDate>,
}

impl Application {
    /// Generators plus inverters; missing only when both are missing.
    pub fn total_qty(&self) -> Option<f64> {
        add_present(self.generator_qty, self.inverter_qty)
    }
}

/// Reads a raw application table from a CSV file.
///
/// # Errors
///
/// Returns [`PipelineError::Load`] if the file cannot be read or a numeric
/// cell is malformed, [`PipelineError::MissingColumn`] if an expected column
/// is absent, and [`PipelineError::AggregationInconsistency`] if a quantity
/// slot column falls outside the fixed slot layout.
pub fn read_applications(path: &Path) -> PipelineResult<RawTable> {
    let source = path.display().to_string();
    let file = File::open(path).map_err(|e| PipelineError::load(&source, e.to_string()))?;
    let table = read_applications_from_reader(file, &source)?;
    log::info!("applications: {} rows from {source}", table.rows.len());
    Ok(table)
}

/// Reads a raw application table from any CSV reader. See [`read_applications`].
pub fn read_applications_from_reader(
    reader: impl Read,
    source_name: &str,
) -> PipelineResult<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| PipelineError::load(source_name, e.to_string()))?
        .clone();
    let columns = ColumnMap::resolve(&headers, source_name)?;

    let mut rows = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| PipelineError::load(source_name, e.to_string()))?;
        rows.push(columns.parse_row(&record, source_name, row + 2)?);
    }
    Ok(RawTable {
        source_name: source_name.to_string(),
        rows,
    })
}

/// Header positions of every column the cleaner reads.
struct ColumnMap {
    app_id: usize,
    utility: usize,
    status: usize,
    received: usize,
    completed: usize,
    self_installer: usize,
    installer: usize,
    size_dc: usize,
    size_ac: usize,
    inverter: [usize; SLOT_COUNT],
    generator: [usize; SLOT_COUNT],
}

impl ColumnMap {
    fn resolve(headers: &csv::StringRecord, source_name: &str) -> PipelineResult<Self> {
        check_slot_layout(headers, INVERTER_PREFIX, source_name)?;
        check_slot_layout(headers, GENERATOR_PREFIX, source_name)?;

        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| PipelineError::MissingColumn {
                    source_name: source_name.to_string(),
                    column: name.to_string(),
                })
        };
        let slots = |prefix: &str| -> PipelineResult<[usize; SLOT_COUNT]> {
            let mut idx = [0; SLOT_COUNT];
            for (i, slot) in idx.iter_mut().enumerate() {
                *slot = find(&format!("{prefix} {}", i + 1))?;
            }
            Ok(idx)
        };

        Ok(Self {
            app_id: find(APP_ID)?,
            utility: find(UTILITY)?,
            status: find(STATUS)?,
            received: find(RECEIVED)?,
            completed: find(COMPLETED)?,
            self_installer: find(SELF_INSTALLER)?,
            installer: find(INSTALLER)?,
            size_dc: find(SIZE_DC)?,
            size_ac: find(SIZE_AC)?,
            inverter: slots(INVERTER_PREFIX)?,
            generator: slots(GENERATOR_PREFIX)?,
        })
    }

    fn parse_row(
        &self,
        record: &csv::StringRecord,
        source_name: &str,
        line: usize,
    ) -> PipelineResult<RawApplication> {
        let text = |idx: usize| record.get(idx).unwrap_or("").to_string();
        let number = |idx: usize| parse_number(record.get(idx).unwrap_or(""), source_name, line);

        let mut inverter_slots = [None; SLOT_COUNT];
        let mut generator_slots = [None; SLOT_COUNT];
        for i in 0..SLOT_COUNT {
            inverter_slots[i] = number(self.inverter[i])?;
            generator_slots[i] = number(self.generator[i])?;
        }

        Ok(RawApplication {
            app_id: text(self.app_id),
            utility: text(self.utility),
            status: text(self.status),
            date_received: text(self.received),
            date_completed: text(self.completed),
            self_installer: text(self.self_installer),
            installer: text(self.installer),
            size_dc: number(self.size_dc)?,
            size_ac: number(self.size_ac)?,
            inverter_slots,
            generator_slots,
        })
    }
}

/// Rejects slot columns beyond the fixed layout, e.g. `Inverter Quantity 6`.
fn check_slot_layout(
    headers: &csv::StringRecord,
    prefix: &str,
    source_name: &str,
) -> PipelineResult<()> {
    for h in headers.iter() {
        let Some(suffix) = h.strip_prefix(prefix) else {
            continue;
        };
        let in_layout = suffix
            .trim()
            .parse::<usize>()
            .is_ok_and(|n| (1..=SLOT_COUNT).contains(&n));
        if !in_layout {
            return Err(PipelineError::AggregationInconsistency {
                source_name: source_name.to_string(),
                group: prefix.to_lowercase(),
                column: h.to_string(),
            });
        }
    }
    Ok(())
}

/// Empty and `NaN` cells are missing; anything else must be a number.
fn parse_number(cell: &str, source_name: &str, line: usize) -> PipelineResult<Option<f64>> {
    if cell.is_empty() {
        return Ok(None);
    }
    let cleaned = cell.replace(',', "");
    cleaned
        .parse::<f64>()
        .map(|v| non_nan(Some(v)))
        .map_err(|_| PipelineError::load(source_name, format!("line {line}: invalid number \"{cell}\"")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Application Id,Utility,Application Status,App Received Date,\
        App Complete Date,Self Installer,Installer Name,System Size DC,System Size AC,\
        Inverter Quantity 1,Inverter Quantity 2,Inverter Quantity 3,Inverter Quantity 4,\
        Inverter Quantity 5,Generator Quantity 1,Generator Quantity 2,Generator Quantity 3,\
        Generator Quantity 4,Generator Quantity 5";

    #[test]
    fn parses_row_with_missing_cells() {
        let csv = format!(
            "{HEADER}\nPGE-1,PGE,Completed,2008-03-01,2008-05-20,No,Sun Co,3.5,NaN,2,,,,,,,,,\n"
        );
        let table = read_applications_from_reader(csv.as_bytes(), "pge.csv")
            .expect("table should parse");
        assert_eq!(table.rows.len(), 1);
        let row = &table.rows[0];
        assert_eq!(row.app_id, "PGE-1");
        assert_eq!(row.size_dc, Some(3.5));
        assert_eq!(row.size_ac, None);
        assert_eq!(row.inverter_slots, [Some(2.0), None, None, None, None]);
        assert_eq!(row.generator_slots, [None; SLOT_COUNT]);
    }

    #[test]
    fn thousands_separator_is_accepted() {
        assert_eq!(parse_number("1,250.5", "t", 2).ok().flatten(), Some(1250.5));
        assert!(parse_number("many", "t", 2).is_err());
    }

    #[test]
    fn missing_column_is_named() {
        let header = HEADER.replace("System Size AC,", "");
        let csv = format!("{header}\n");
        let err = read_applications_from_reader(csv.as_bytes(), "sce.csv")
            .expect_err("missing column should fail");
        assert!(
            matches!(err, PipelineError::MissingColumn { ref column, .. } if column == SIZE_AC)
        );
    }

    #[test]
    fn extra_slot_column_is_inconsistent() {
        let csv = format!("{HEADER},Generator Quantity 6\n");
        let err = read_applications_from_reader(csv.as_bytes(), "sdge.csv")
            .expect_err("sixth slot should fail");
        assert!(matches!(err, PipelineError::AggregationInconsistency { .. }));
    }

    #[test]
    fn total_qty_treats_single_missing_operand_as_zero() {
        let app = Application {
            app_id: "X-1".into(),
            jurisdiction: Jurisdiction::new("x"),
            status: String::new(),
            installer: String::new(),
            date_received: NaiveDate::default(),
            date_completed: None,
            is_self_install: false,
            size_dc: None,
            size_ac: None,
            inverter_qty: Some(2.0),
            generator_qty: None,
            subsidy_per_watt: 0.0,
            receipt_month: NaiveDate::default(),
            completion_month: None,
        };
        assert_eq!(app.total_qty(), Some(2.0));
    }
}
