//! Cutoff loader: per-utility subsidy tables into one [`SubsidySchedule`].

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use chrono::NaiveDate;

use super::jurisdiction::Jurisdiction;
use super::schedule::{ScheduleEntry, SubsidySchedule};
use crate::error::{PipelineError, PipelineResult};

const YEAR: &str = "year";
const MONTH: &str = "month";
const DAY: &str = "day";
const RATE: &str = "subsidyperwatt";

/// Loads every jurisdiction's cutoff table and unions them.
///
/// Tables are concatenated in jurisdiction-code order without deduplication.
///
/// # Errors
///
/// Returns [`PipelineError::Load`] if a file cannot be opened or a row fails to
/// parse, and [`PipelineError::MissingColumn`] if a required column is absent.
pub fn load_schedules(paths: &BTreeMap<Jurisdiction, PathBuf>) -> PipelineResult<SubsidySchedule> {
    let mut entries = Vec::new();
    for (jurisdiction, path) in paths {
        let source = path.display().to_string();
        let file = File::open(path).map_err(|e| PipelineError::load(&source, e.to_string()))?;
        let loaded = load_schedule_from_reader(jurisdiction, file, &source)?;
        log::info!(
            "cutoffs: {} entries for {jurisdiction} from {source}",
            loaded.len()
        );
        entries.extend(loaded);
    }
    Ok(SubsidySchedule::from_entries(entries))
}

/// Parses one jurisdiction's cutoff table from CSV.
///
/// The day column may be named `day` or `<code>_day` (e.g. `pge_day`).
/// Month and day are zero-padded before the `YYYY-MM-DD` date is parsed.
///
/// # Errors
///
/// See [`load_schedules`]. `source_name` identifies the input in errors.
pub fn load_schedule_from_reader(
    jurisdiction: &Jurisdiction,
    reader: impl Read,
    source_name: &str,
) -> PipelineResult<Vec<ScheduleEntry>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| PipelineError::load(source_name, e.to_string()))?
        .clone();

    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| PipelineError::MissingColumn {
                source_name: source_name.to_string(),
                column: name.to_string(),
            })
    };
    let year_idx = find(YEAR)?;
    let month_idx = find(MONTH)?;
    let prefixed_day = format!("{jurisdiction}_{DAY}");
    let day_idx = find(DAY).or_else(|_| find(&prefixed_day))?;
    let rate_idx = find(RATE)?;

    let mut entries = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| PipelineError::load(source_name, e.to_string()))?;
        let cell = |idx: usize| record.get(idx).unwrap_or("");
        // Header is line 1.
        let line = row + 2;

        let effective_date = compose_date(cell(year_idx), cell(month_idx), cell(day_idx))
            .ok_or_else(|| {
                PipelineError::load(
                    source_name,
                    format!(
                        "line {line}: invalid date {}-{}-{}",
                        cell(year_idx),
                        cell(month_idx),
                        cell(day_idx)
                    ),
                )
            })?;
        let subsidy_per_watt: f64 = cell(rate_idx).parse().map_err(|_| {
            PipelineError::load(
                source_name,
                format!("line {line}: invalid subsidy rate \"{}\"", cell(rate_idx)),
            )
        })?;

        entries.push(ScheduleEntry {
            jurisdiction: jurisdiction.clone(),
            effective_date,
            subsidy_per_watt,
        });
    }
    Ok(entries)
}

/// Builds a date from a year/month/day triple of text cells.
fn compose_date(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    let iso = format!("{year}-{month:0>2}-{day:0>2}");
    NaiveDate::parse_from_str(&iso, "%Y-%m-%d").ok()
}
