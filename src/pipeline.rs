//! End-to-end run: load, clean, aggregate, regress, export.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::config::PipelineConfig;
use crate::data::{
    CleanStats, CleanedRecords, Jurisdiction, MonthlyPanel, RawTable, SubsidySchedule,
    build_panel, clean, load_schedules, read_applications,
};
use crate::error::PipelineResult;
use crate::io::export::{export_regressions, export_tables};
use crate::regression::{RegressionOutputs, run_regressions};

/// Everything the data stages produce before any model is fit.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub schedule: SubsidySchedule,
    pub cleaned: CleanedRecords,
    pub panel: MonthlyPanel,
}

/// Loads the schedules and application exports, cleans them, and builds the panel.
///
/// # Errors
///
/// Returns the first load or parse failure.
pub fn prepare(config: &PipelineConfig) -> PipelineResult<PreparedData> {
    let schedule = load_schedules(&config.cutoff_paths())?;

    let mut tables: BTreeMap<Jurisdiction, RawTable> = BTreeMap::new();
    for (jurisdiction, path) in config.application_paths() {
        let table = read_applications(&path)?;
        tables.insert(jurisdiction, table);
    }

    let cleaned = clean(&tables, &schedule, &config.clean_options())?;
    let panel = build_panel(&cleaned.records);
    Ok(PreparedData {
        schedule,
        cleaned,
        panel,
    })
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub schedule_entries: usize,
    pub stats: CleanStats,
    /// Retained records per jurisdiction.
    pub kept_by_jurisdiction: BTreeMap<Jurisdiction, usize>,
    pub panel_rows: usize,
    /// `None` when the regression stage was disabled.
    pub productivity_fits: Option<usize>,
    pub subsidy_fits: Option<usize>,
    pub out_dir: PathBuf,
    pub written: Vec<PathBuf>,
}

/// Runs every stage and writes the outputs into the configured directory.
///
/// # Errors
///
/// Any load, regression, or export failure aborts the run.
pub fn run_pipeline(config: &PipelineConfig) -> PipelineResult<PipelineReport> {
    let prepared = prepare(config)?;
    let records = &prepared.cleaned.records;
    let out_dir = config.output.dir.clone();

    let mut written = export_tables(records, &prepared.panel, &out_dir)?;

    let regressions = if config.regression.enabled {
        let outputs = run_regressions(
            records,
            &prepared.panel,
            &config.jurisdiction_codes(),
            config.regression.min_month,
        )?;
        written.extend(export_regressions(
            &outputs.productivity,
            &outputs.subsidy.table,
            &outputs.subsidy.histograms,
            &out_dir,
        )?);
        Some(outputs)
    } else {
        log::info!("regressions disabled, skipping model stage");
        None
    };
    log::info!("wrote {} files to {}", written.len(), out_dir.display());

    let mut kept_by_jurisdiction = BTreeMap::new();
    for a in records {
        *kept_by_jurisdiction.entry(a.jurisdiction.clone()).or_insert(0) += 1;
    }

    Ok(PipelineReport {
        schedule_entries: prepared.schedule.len(),
        stats: prepared.cleaned.stats,
        kept_by_jurisdiction,
        panel_rows: prepared.panel.len(),
        productivity_fits: regressions.as_ref().map(fit_count),
        subsidy_fits: regressions.as_ref().map(|r| r.subsidy.fits.len()),
        out_dir,
        written,
    })
}

fn fit_count(outputs: &RegressionOutputs) -> usize {
    outputs.productivity.iter().map(|p| p.fits.len()).sum()
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Pipeline Report ---")?;
        writeln!(f, "Cutoff entries:        {}", self.schedule_entries)?;
        writeln!(f, "Applications read:     {}", self.stats.read)?;
        writeln!(f, "Outside window:        {}", self.stats.outside_window)?;
        writeln!(f, "Self-installed:        {}", self.stats.self_installed)?;
        writeln!(f, "Records kept:          {}", self.stats.kept)?;
        for (jurisdiction, kept) in &self.kept_by_jurisdiction {
            writeln!(f, "  {:<20} {kept}", jurisdiction.as_str())?;
        }
        writeln!(f, "Panel rows:            {}", self.panel_rows)?;
        match (self.productivity_fits, self.subsidy_fits) {
            (Some(p), Some(s)) => {
                writeln!(f, "Productivity fits:     {p}")?;
                writeln!(f, "Subsidy fits:          {s}")?;
            }
            _ => writeln!(f, "Regressions:           skipped")?,
        }
        write!(
            f,
            "Output:                {} files in {}",
            self.written.len(),
            self.out_dir.display()
        )
    }
}
