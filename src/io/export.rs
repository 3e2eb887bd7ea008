//! CSV and table export for cleaned records, the panel, and regression outputs.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::data::{Application, MonthlyPanel};
use crate::error::PipelineResult;
use crate::regression::{FitSeries, ProductivityResult, ReceiptHistogram, SummaryTable};

/// Column header of the cleaned record table.
pub const SAMPLE_HEADER: &str = "app_id,iou,app_status,installer,date_receive,date_complete,\
                                 self_install,size_dc,size_ac,gen_q,inv_q,\
                                 month_year_receive,month_year_complete,subsidy";

/// Column header of the monthly panel.
pub const PANEL_HEADER: &str = "iou,month_year,size_comp,size_conc,gen_q_comp,gen_q_conc,\
                                inv_q_comp,inv_q_conc,q_comp,q_conc";

const FIT_HEADER: &str = "month_year,x,y,fitted";
const HIST_HEADER: &str = "month_year,applications,min_subsidy_per_kw,max_subsidy_per_kw";
const PLOT_INDEX_HEADER: &str = "file,title,x_label,y_label,x_max,y_max";

fn header(h: &str) -> impl Iterator<Item = &str> {
    h.split(',').map(str::trim)
}

/// Missing values become empty cells.
fn opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn opt_date(value: Option<NaiveDate>) -> String {
    value.map(|d| d.to_string()).unwrap_or_default()
}

/// Writes cleaned records as CSV to any writer. Output is deterministic.
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_sample_csv(records: &[Application], writer: impl Write) -> PipelineResult<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(header(SAMPLE_HEADER))?;
    for a in records {
        wtr.write_record(&[
            a.app_id.clone(),
            a.jurisdiction.to_string(),
            a.status.clone(),
            a.installer.clone(),
            a.date_received.to_string(),
            opt_date(a.date_completed),
            if a.is_self_install { "Yes" } else { "No" }.to_string(),
            opt(a.size_dc),
            opt(a.size_ac),
            opt(a.generator_qty),
            opt(a.inverter_qty),
            a.receipt_month.to_string(),
            opt_date(a.completion_month),
            a.subsidy_per_watt.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the monthly panel as CSV to any writer.
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_panel_csv(panel: &MonthlyPanel, writer: impl Write) -> PipelineResult<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(header(PANEL_HEADER))?;
    for e in &panel.entries {
        wtr.write_record(&[
            e.jurisdiction.to_string(),
            e.month.to_string(),
            opt(e.completed_size),
            opt(e.concurrent_size),
            opt(e.completed_generator_qty),
            opt(e.concurrent_generator_qty),
            opt(e.completed_inverter_qty),
            opt(e.concurrent_inverter_qty),
            opt(e.completed_total_qty),
            opt(e.concurrent_total_qty),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes one scatter/fit series as CSV.
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_fit_csv(series: &FitSeries, writer: impl Write) -> PipelineResult<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(header(FIT_HEADER))?;
    for p in &series.points {
        wtr.write_record(&[
            p.month.to_string(),
            p.x.to_string(),
            p.y.to_string(),
            format!("{:.6}", p.fitted),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes one receipt histogram as CSV.
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_histogram_csv(hist: &ReceiptHistogram, writer: impl Write) -> PipelineResult<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(header(HIST_HEADER))?;
    for b in &hist.bins {
        wtr.write_record(&[
            b.month.to_string(),
            b.applications.to_string(),
            b.min_subsidy_per_kw.to_string(),
            b.max_subsidy_per_kw.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes `contents` to `dir/name` and returns the path.
fn write_file(dir: &Path, name: &str, contents: &str) -> io::Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, contents)?;
    Ok(path)
}

fn create(dir: &Path, name: &str) -> io::Result<(PathBuf, io::BufWriter<File>)> {
    let path = dir.join(name);
    let file = File::create(&path)?;
    Ok((path, io::BufWriter::new(file)))
}

/// Exports the cleaned records and the panel into `dir`.
///
/// Returns the written paths.
///
/// # Errors
///
/// Returns an I/O or CSV error if the directory or a file cannot be written.
pub fn export_tables(
    records: &[Application],
    panel: &MonthlyPanel,
    dir: &Path,
) -> PipelineResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let (sample_path, sample) = create(dir, "sample.csv")?;
    write_sample_csv(records, sample)?;
    let (panel_path, panel_out) = create(dir, "ioumy.csv")?;
    write_panel_csv(panel, panel_out)?;
    Ok(vec![sample_path, panel_path])
}

/// Exports summary tables, fit series, histograms, and a plot index into `dir`.
///
/// Returns the written paths.
///
/// # Errors
///
/// Returns an I/O or CSV error if a file cannot be written.
pub fn export_regressions(
    productivity: &[ProductivityResult],
    subsidy_table: &SummaryTable,
    histograms: &[ReceiptHistogram],
    dir: &Path,
) -> PipelineResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    let mut index = csv::WriterBuilder::new().from_writer(Vec::new());
    index.write_record(header(PLOT_INDEX_HEADER))?;

    for result in productivity {
        let endog = result.model.endog;
        written.extend(write_table(dir, endog, &result.table)?);
        for series in &result.series {
            let name = format!("{endog}_{}_fit.csv", series.jurisdiction);
            let (path, out) = create(dir, &name)?;
            write_fit_csv(series, out)?;
            index.write_record(&[
                name,
                series.title.clone(),
                series.x_label.clone(),
                series.y_label.clone(),
                result.x_limit.to_string(),
                result.y_limit.to_string(),
            ])?;
            written.push(path);
        }
    }

    written.extend(write_table(dir, "log_gen_q", subsidy_table)?);
    for hist in histograms {
        let (path, out) = create(dir, &format!("app_hist_{}.csv", hist.jurisdiction))?;
        write_histogram_csv(hist, out)?;
        written.push(path);
    }

    let index = index
        .into_inner()
        .map_err(|e| io::Error::other(e.to_string()))?;
    let (index_path, mut out) = create(dir, "plots.csv")?;
    out.write_all(&index)?;
    out.flush()?;
    written.push(index_path);

    Ok(written)
}

fn write_table(dir: &Path, stem: &str, table: &SummaryTable) -> PipelineResult<[PathBuf; 2]> {
    let text = write_file(dir, &format!("{stem}_res.txt"), &table.render_text())?;
    let tex = write_file(dir, &format!("{stem}_res.tex"), &table.render_latex())?;
    Ok([text, tex])
}
