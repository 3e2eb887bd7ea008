//! Installer productivity: completed load regressed on concurrent load.

use chrono::NaiveDate;

use super::ols::{OlsFit, Regressor, fit_ols};
use super::summary::SummaryTable;
use crate::data::{Jurisdiction, MonthlyPanel, PanelEntry};
use crate::error::PipelineResult;

/// One productivity specification: `endog ~ exog + constant` per jurisdiction.
#[derive(Debug, Clone, Copy)]
pub struct ProductivityModel {
    pub title: &'static str,
    /// Panel column of the dependent variable; also names output files.
    pub endog: &'static str,
    pub exog: &'static str,
    /// Row label of the slope in summary tables.
    pub exog_label: &'static str,
    /// Picks `(endog, exog)` from a panel row.
    pub select: fn(&PanelEntry) -> (Option<f64>, Option<f64>),
}

pub const PRODUCTIVITY_MODELS: [ProductivityModel; 2] = [
    ProductivityModel {
        title: "Size DC (Kw)",
        endog: "size_comp",
        exog: "size_conc",
        exog_label: "Size Committed To",
        select: |e| (e.completed_size, e.concurrent_size),
    },
    ProductivityModel {
        title: "Total Quantity",
        endog: "q_comp",
        exog: "q_conc",
        exog_label: "Quantity Committed To",
        select: |e| (e.completed_total_qty, e.concurrent_total_qty),
    },
];

/// Observation of a scatter/fit plot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitPoint {
    pub month: NaiveDate,
    pub x: f64,
    pub y: f64,
    pub fitted: f64,
}

/// Everything a chart needs for one jurisdiction's scatter and fit line.
#[derive(Debug, Clone)]
pub struct FitSeries {
    pub jurisdiction: Jurisdiction,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<FitPoint>,
}

/// Fits of one model across jurisdictions.
#[derive(Debug, Clone)]
pub struct ProductivityResult {
    pub model: ProductivityModel,
    pub fits: Vec<(Jurisdiction, OlsFit)>,
    pub series: Vec<FitSeries>,
    /// Shared axis limits: 1.1 times the largest value across jurisdictions.
    pub x_limit: f64,
    pub y_limit: f64,
    pub table: SummaryTable,
}

/// Runs every productivity model on panel months on or after `min_month`.
///
/// Months missing either variable are dropped per jurisdiction. A
/// jurisdiction left with no more observations than regressors is skipped
/// with a warning instead of failing the run.
///
/// # Errors
///
/// Propagates [`crate::error::PipelineError::Regression`] from the solver.
pub fn run_productivity(
    panel: &MonthlyPanel,
    jurisdictions: &[Jurisdiction],
    min_month: NaiveDate,
) -> PipelineResult<Vec<ProductivityResult>> {
    PRODUCTIVITY_MODELS
        .iter()
        .map(|model| run_model(model, panel, jurisdictions, min_month))
        .collect()
}

fn run_model(
    model: &ProductivityModel,
    panel: &MonthlyPanel,
    jurisdictions: &[Jurisdiction],
    min_month: NaiveDate,
) -> PipelineResult<ProductivityResult> {
    let in_range: Vec<&PanelEntry> = panel
        .entries
        .iter()
        .filter(|e| e.month >= min_month)
        .collect();

    let (mut x_max, mut y_max) = (0.0_f64, 0.0_f64);
    for e in &in_range {
        let (y, x) = (model.select)(e);
        x_max = x_max.max(x.unwrap_or(0.0));
        y_max = y_max.max(y.unwrap_or(0.0));
    }

    let mut table = SummaryTable::new(
        model.title,
        &[(model.exog, model.exog_label), ("constant", "Constant")],
    );
    let mut fits = Vec::new();
    let mut series = Vec::new();

    for jurisdiction in jurisdictions {
        let rows: Vec<&PanelEntry> = in_range
            .iter()
            .copied()
            .filter(|e| &e.jurisdiction == jurisdiction)
            .collect();
        let complete: Vec<(NaiveDate, f64, f64)> = rows
            .iter()
            .filter_map(|e| match (model.select)(e) {
                (Some(y), Some(x)) => Some((e.month, x, y)),
                _ => None,
            })
            .collect();
        log::info!(
            "NaNs for {} in {jurisdiction}: {} out of {}",
            model.title,
            rows.len() - complete.len(),
            rows.len()
        );
        if complete.len() <= 2 {
            log::warn!(
                "productivity: skipping {} for {jurisdiction}, only {} usable months",
                model.title,
                complete.len()
            );
            continue;
        }

        let y: Vec<f64> = complete.iter().map(|&(_, _, y)| y).collect();
        let x: Vec<f64> = complete.iter().map(|&(_, x, _)| x).collect();
        let fit = fit_ols(
            &format!("{} ({jurisdiction})", model.title),
            &y,
            &[Regressor::new(model.exog, x), Regressor::constant(y.len())],
        )?;

        let points = complete
            .iter()
            .zip(&fit.fitted)
            .map(|(&(month, x, y), &fitted)| FitPoint { month, x, y, fitted })
            .collect();
        series.push(FitSeries {
            jurisdiction: jurisdiction.clone(),
            title: format!(
                "{}, {} (N Months = {})",
                jurisdiction.as_str().to_uppercase(),
                model.title,
                complete.len()
            ),
            x_label: format!("Concurrent {} Committed To Per Month", model.title),
            y_label: format!("{} Installed Per Month", model.title),
            points,
        });
        table.add_column(jurisdiction.as_str().to_uppercase(), &fit);
        fits.push((jurisdiction.clone(), fit));
    }

    Ok(ProductivityResult {
        model: *model,
        fits,
        series,
        x_limit: 1.1 * x_max,
        y_limit: 1.1 * y_max,
        table,
    })
}
