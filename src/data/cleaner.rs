//! Record cleaner: raw application rows into filtered, enriched [`Application`]s.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};

use super::jurisdiction::Jurisdiction;
use super::missing::sum_present;
use super::records::{Application, RawApplication, RawTable};
use super::schedule::SubsidySchedule;
use crate::error::{PipelineError, PipelineResult};

/// Days after the last cutoff during which applications are still kept.
pub const DEFAULT_GRACE_DAYS: i64 = 90;

/// Largest grace period a configuration may ask for.
pub const MAX_GRACE_DAYS: i64 = 3650;

/// Tunables for [`clean`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanOptions {
    pub grace_days: i64,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            grace_days: DEFAULT_GRACE_DAYS,
        }
    }
}

/// Row counts per cleaning step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub read: usize,
    pub outside_window: usize,
    pub self_installed: usize,
    pub kept: usize,
    /// Kept records whose receipt month falls after their completion month.
    pub received_after_completion: usize,
}

/// Output of the cleaner.
#[derive(Debug, Clone, Default)]
pub struct CleanedRecords {
    pub records: Vec<Application>,
    pub stats: CleanStats,
}

/// Inclusive receipt-date window for one jurisdiction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptWindow {
    pub earliest: NaiveDate,
    pub latest: NaiveDate,
}

impl ReceiptWindow {
    /// Schedule span widened by `grace_days` past the last cutoff.
    ///
    /// `None` when the jurisdiction has no cutoffs; such jurisdictions keep no records.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidWindow`] if the widened end date is not
    /// representable.
    pub fn for_jurisdiction(
        schedule: &SubsidySchedule,
        jurisdiction: &Jurisdiction,
        grace_days: i64,
    ) -> PipelineResult<Option<Self>> {
        let Some((earliest, last_cutoff)) = schedule.span(jurisdiction) else {
            return Ok(None);
        };
        let latest = Duration::try_days(grace_days)
            .and_then(|grace| last_cutoff.checked_add_signed(grace))
            .ok_or_else(|| PipelineError::InvalidWindow {
                jurisdiction: jurisdiction.to_string(),
                grace_days,
            })?;
        Ok(Some(Self { earliest, latest }))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.earliest <= date && date <= self.latest
    }
}

/// Cleans every raw table against the subsidy schedule.
///
/// Steps, in order: jurisdiction normalization, date parsing, receipt-window
/// filter, self-installer exclusion, subsidy resolution, slot aggregation,
/// month truncation. A row's jurisdiction comes from its `Utility` cell,
/// falling back to the table's key when the cell is blank.
///
/// # Errors
///
/// Returns [`PipelineError::Load`] if any row carries a non-empty date that
/// does not parse; the whole load fails rather than skipping the row.
pub fn clean(
    raw_tables: &BTreeMap<Jurisdiction, RawTable>,
    schedule: &SubsidySchedule,
    options: &CleanOptions,
) -> PipelineResult<CleanedRecords> {
    let mut windows: BTreeMap<Jurisdiction, Option<ReceiptWindow>> = BTreeMap::new();
    let mut stats = CleanStats::default();
    let mut records = Vec::new();

    for (table_jurisdiction, table) in raw_tables {
        for raw in &table.rows {
            stats.read += 1;

            let jurisdiction = if raw.utility.trim().is_empty() {
                table_jurisdiction.clone()
            } else {
                Jurisdiction::new(&raw.utility)
            };
            let date_received = parse_row_date(&raw.date_received, raw, &table.source_name)?;
            let date_completed = parse_row_date(&raw.date_completed, raw, &table.source_name)?;

            let window = match windows.get(&jurisdiction) {
                Some(w) => *w,
                None => {
                    let w = ReceiptWindow::for_jurisdiction(
                        schedule,
                        &jurisdiction,
                        options.grace_days,
                    )?;
                    if w.is_none() {
                        log::warn!("clean: no subsidy cutoffs for {jurisdiction}, dropping its records");
                    }
                    windows.insert(jurisdiction.clone(), w);
                    w
                }
            };
            let Some(date_received) =
                date_received.filter(|d| window.is_some_and(|w| w.contains(*d)))
            else {
                stats.outside_window += 1;
                continue;
            };

            let is_self_install = !raw.self_installer.trim().eq_ignore_ascii_case("no");
            if is_self_install {
                stats.self_installed += 1;
                continue;
            }

            let app = enrich(raw, jurisdiction, date_received, date_completed, schedule);
            if app.completion_month.is_some_and(|m| m < app.receipt_month) {
                stats.received_after_completion += 1;
                log::debug!("clean: {} completed before it was received", app.app_id);
            }
            records.push(app);
        }
    }

    stats.kept = records.len();
    log::info!(
        "clean: read {}, outside window {}, self-installed {}, kept {}",
        stats.read,
        stats.outside_window,
        stats.self_installed,
        stats.kept
    );
    if stats.received_after_completion > 0 {
        log::warn!(
            "clean: {} records have a receipt month after their completion month",
            stats.received_after_completion
        );
    }
    Ok(CleanedRecords { records, stats })
}

/// Attaches subsidy, slot aggregates, and months to a row that passed the filters.
fn enrich(
    raw: &RawApplication,
    jurisdiction: Jurisdiction,
    date_received: NaiveDate,
    date_completed: Option<NaiveDate>,
    schedule: &SubsidySchedule,
) -> Application {
    let subsidy_per_watt = schedule.resolve(&jurisdiction, date_received);
    Application {
        app_id: raw.app_id.clone(),
        status: raw.status.clone(),
        installer: raw.installer.clone(),
        date_received,
        date_completed,
        is_self_install: false,
        size_dc: raw.size_dc,
        size_ac: raw.size_ac,
        inverter_qty: aggregate_slots(&raw.inverter_slots),
        generator_qty: aggregate_slots(&raw.generator_slots),
        subsidy_per_watt,
        receipt_month: month_of(date_received),
        completion_month: date_completed.map(month_of),
        jurisdiction,
    }
}

/// Sum of the present slots, or `None` when every slot is missing.
pub fn aggregate_slots(slots: &[Option<f64>]) -> Option<f64> {
    sum_present(slots.iter().copied())
}

/// First day of the date's month.
pub fn month_of(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Parses a date cell. Empty cells are missing; a time-of-day suffix is ignored.
///
/// # Errors
///
/// Returns the parse error when the cell is not in `YYYY-MM-DD`,
/// `MM/DD/YYYY` or `YYYY/MM/DD` layout.
pub fn parse_date(text: &str) -> Result<Option<NaiveDate>, chrono::ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    let date_part = text
        .split(|c: char| c == ' ' || c == 'T')
        .next()
        .unwrap_or(text);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%m/%d/%Y"))
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%Y/%m/%d"))
        .map(Some)
}

fn parse_row_date(
    text: &str,
    raw: &RawApplication,
    source_name: &str,
) -> PipelineResult<Option<NaiveDate>> {
    parse_date(text).map_err(|e| {
        PipelineError::load(
            source_name,
            format!("application {}: unparseable date \"{text}\" ({e})", raw.app_id),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::records::SLOT_COUNT;
    use crate::data::schedule::ScheduleEntry;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
    }

    fn schedule_x() -> SubsidySchedule {
        let x = Jurisdiction::new("x");
        SubsidySchedule::from_entries(vec![
            ScheduleEntry {
                jurisdiction: x.clone(),
                effective_date: day(2007, 1, 1),
                subsidy_per_watt: 0.5,
            },
            ScheduleEntry {
                jurisdiction: x,
                effective_date: day(2009, 1, 1),
                subsidy_per_watt: 0.3,
            },
        ])
    }

    fn raw(id: &str, utility: &str, received: &str, completed: &str) -> RawApplication {
        RawApplication {
            app_id: id.to_string(),
            utility: utility.to_string(),
            date_received: received.to_string(),
            date_completed: completed.to_string(),
            self_installer: "No".to_string(),
            size_dc: Some(4.0),
            ..RawApplication::default()
        }
    }

    fn tables(rows: Vec<RawApplication>) -> BTreeMap<Jurisdiction, RawTable> {
        let mut map = BTreeMap::new();
        map.insert(
            Jurisdiction::new("x"),
            RawTable {
                source_name: "x.csv".to_string(),
                rows,
            },
        );
        map
    }

    fn run(rows: Vec<RawApplication>) -> PipelineResult<CleanedRecords> {
        clean(&tables(rows), &schedule_x(), &CleanOptions::default())
    }

    #[test]
    fn record_inside_window_is_retained() {
        let out = run(vec![raw("X-1", "X", "2007-03-01", "2007-03-20")]).expect("clean");
        assert_eq!(out.records.len(), 1);
        let app = &out.records[0];
        assert_eq!(app.jurisdiction.as_str(), "x");
        assert_eq!(app.subsidy_per_watt, 0.5);
        assert_eq!(app.receipt_month, day(2007, 3, 1));
        assert_eq!(app.completion_month, Some(day(2007, 3, 1)));
    }

    #[test]
    fn overflowing_grace_period_is_an_error() {
        let options = CleanOptions {
            grace_days: 1_000_000_000,
        };
        let window =
            ReceiptWindow::for_jurisdiction(&schedule_x(), &Jurisdiction::new("x"), options.grace_days);
        assert!(matches!(window, Err(PipelineError::InvalidWindow { .. })));
        let out = clean(
            &tables(vec![raw("X-1", "x", "2007-03-01", "")]),
            &schedule_x(),
            &options,
        );
        assert!(matches!(
            out,
            Err(PipelineError::InvalidWindow {
                grace_days: 1_000_000_000,
                ..
            })
        ));
    }

    #[test]
    fn grace_period_extends_past_last_cutoff() {
        let out = run(vec![
            raw("in", "x", "2009-04-01", ""),
            raw("edge", "x", "2009-01-01", ""),
            raw("late", "x", "2009-04-02", ""),
            raw("early", "x", "2006-12-31", ""),
        ])
        .expect("clean");
        let ids: Vec<&str> = out.records.iter().map(|a| a.app_id.as_str()).collect();
        // 2009-01-01 + 90 days = 2009-04-01
        assert_eq!(ids, vec!["in", "edge"]);
        assert_eq!(out.stats.outside_window, 2);
    }

    #[test]
    fn jurisdiction_without_schedule_keeps_nothing() {
        let out = run(vec![raw("Y-1", "y", "2008-01-01", "2008-02-01")]).expect("clean");
        assert!(out.records.is_empty());
        assert_eq!(out.stats.outside_window, 1);
    }

    #[test]
    fn missing_receipt_date_is_dropped() {
        let out = run(vec![raw("X-1", "x", "", "2008-02-01")]).expect("clean");
        assert!(out.records.is_empty());
    }

    #[test]
    fn self_installers_are_excluded() {
        let mut yes = raw("X-1", "x", "2008-01-01", "");
        yes.self_installer = "Yes".to_string();
        let mut blank = raw("X-2", "x", "2008-01-01", "");
        blank.self_installer = String::new();
        let out = run(vec![yes, blank, raw("X-3", "x", "2008-01-01", "")]).expect("clean");
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].app_id, "X-3");
        assert_eq!(out.stats.self_installed, 2);
    }

    #[test]
    fn unparseable_date_fails_whole_load() {
        let err = run(vec![
            raw("X-1", "x", "2008-01-01", ""),
            raw("X-2", "x", "sometime", ""),
        ])
        .expect_err("bad date should fail");
        assert!(err.to_string().contains("X-2"));
    }

    #[test]
    fn bad_date_fails_even_when_row_would_be_filtered() {
        let mut row = raw("X-1", "x", "2001-01-01", "not a date");
        row.self_installer = "Yes".to_string();
        assert!(run(vec![row]).is_err());
    }

    #[test]
    fn slot_aggregation_preserves_missing() {
        let mut row = raw("X-1", "x", "2008-01-01", "2008-02-01");
        row.inverter_slots = [Some(2.0), None, None, None, None];
        row.generator_slots = [None; SLOT_COUNT];
        let out = run(vec![row]).expect("clean");
        let app = &out.records[0];
        assert_eq!(app.generator_qty, None);
        assert_eq!(app.inverter_qty, Some(2.0));
        assert_eq!(app.total_qty(), Some(2.0));
    }

    #[test]
    fn slot_sum_counts_explicit_zeroes() {
        assert_eq!(aggregate_slots(&[Some(0.0), None, None]), Some(0.0));
        assert_eq!(aggregate_slots(&[Some(10.0), Some(4.0), None]), Some(14.0));
        assert_eq!(aggregate_slots(&[None, None]), None);
    }

    #[test]
    fn parses_common_date_layouts() {
        assert_eq!(parse_date("2008-05-20"), Ok(Some(day(2008, 5, 20))));
        assert_eq!(parse_date("05/20/2008"), Ok(Some(day(2008, 5, 20))));
        assert_eq!(parse_date("2008-05-20 00:00:00"), Ok(Some(day(2008, 5, 20))));
        assert_eq!(parse_date("2008-05-20T13:45:00"), Ok(Some(day(2008, 5, 20))));
        assert_eq!(parse_date("  "), Ok(None));
        assert!(parse_date("20/05/2008").is_err());
    }

    #[test]
    fn blank_utility_falls_back_to_table_jurisdiction() {
        let out = run(vec![raw("X-1", "", "2008-01-01", "")]).expect("clean");
        assert_eq!(out.records[0].jurisdiction.as_str(), "x");
    }
}
