//! Subsidy responsiveness: log generator count on log subsidy, with calendar controls.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};

use super::ols::{OlsFit, Regressor, fit_ols};
use super::summary::SummaryTable;
use crate::data::{Application, Jurisdiction};
use crate::error::PipelineResult;

pub const SUBSIDY_TITLE: &str = "ln(Generator Quantity)";
pub const LOG_SUBSIDY: &str = "log_subsidy";

/// One receipt month of the application histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub month: NaiveDate,
    pub applications: usize,
    /// Lowest and highest subsidy received that month, $/kW.
    pub min_subsidy_per_kw: f64,
    pub max_subsidy_per_kw: f64,
}

/// Applications per receipt month for one jurisdiction, overlaid with the subsidy level.
#[derive(Debug, Clone)]
pub struct ReceiptHistogram {
    pub jurisdiction: Jurisdiction,
    pub bins: Vec<HistogramBin>,
}

#[derive(Debug, Clone)]
pub struct SubsidyResult {
    pub fits: Vec<(Jurisdiction, OlsFit)>,
    pub table: SummaryTable,
    pub histograms: Vec<ReceiptHistogram>,
    /// Complete records dropped because a log argument was not positive.
    pub non_positive_dropped: usize,
}

/// Records with every field the subsidy model reads.
fn complete_records<'a>(
    records: &'a [Application],
    jurisdiction: &'a Jurisdiction,
) -> impl Iterator<Item = &'a Application> + 'a {
    records.iter().filter(move |a| {
        &a.jurisdiction == jurisdiction
            && a.date_completed.is_some()
            && a.size_dc.is_some()
            && a.generator_qty.is_some()
            && a.inverter_qty.is_some()
    })
}

/// Fits `ln(generator_qty) ~ month + year dummies + ln(subsidy) + constant + trend`
/// per jurisdiction and builds the receipt histograms.
///
/// Dummies come from the completion date, one level dropped per group. The
/// trend counts days from the Unix epoch to the receipt month. Jurisdictions with too
/// few observations for the design are skipped with a warning.
///
/// # Errors
///
/// Propagates [`crate::error::PipelineError::Regression`] from the solver.
pub fn run_subsidy(
    records: &[Application],
    jurisdictions: &[Jurisdiction],
) -> PipelineResult<SubsidyResult> {
    let mut table = SummaryTable::new(SUBSIDY_TITLE, &[(LOG_SUBSIDY, "ln(Subsidy)")]);
    let mut fits = Vec::new();
    let mut histograms = Vec::new();
    let mut non_positive_dropped = 0;

    for jurisdiction in jurisdictions {
        let sample: Vec<&Application> = complete_records(records, jurisdiction).collect();
        histograms.push(histogram(jurisdiction, &sample));

        let usable: Vec<&Application> = sample
            .iter()
            .copied()
            .filter(|a| a.generator_qty.is_some_and(|g| g > 0.0) && a.subsidy_per_watt > 0.0)
            .collect();
        let dropped = sample.len() - usable.len();
        if dropped > 0 {
            log::warn!(
                "subsidy: {dropped} {jurisdiction} records with non-positive generator count or subsidy left out of log model"
            );
        }
        non_positive_dropped += dropped;

        let regressors = design(&usable);
        if usable.len() <= regressors.len() {
            log::warn!(
                "subsidy: skipping {jurisdiction}, {} observations for {} regressors",
                usable.len(),
                regressors.len()
            );
            continue;
        }
        let y: Vec<f64> = usable
            .iter()
            .map(|a| a.generator_qty.unwrap_or(1.0).ln())
            .collect();
        let fit = fit_ols(&format!("{SUBSIDY_TITLE} ({jurisdiction})"), &y, &regressors)?;
        log::info!(
            "subsidy: {jurisdiction} fitted on {} applications, R² {:.3}",
            fit.nobs,
            fit.r_squared
        );
        table.add_column(jurisdiction.as_str().to_uppercase(), &fit);
        fits.push((jurisdiction.clone(), fit));
    }

    Ok(SubsidyResult {
        fits,
        table,
        histograms,
        non_positive_dropped,
    })
}

/// Builds the regressor columns for one jurisdiction's sample.
fn design(sample: &[&Application]) -> Vec<Regressor> {
    let completion = |a: &Application| a.date_completed.unwrap_or(a.date_received);
    let mut regressors = Vec::new();
    regressors.extend(dummies("month", sample, |a| completion(a).month() as i32));
    regressors.extend(dummies("year", sample, |a| completion(a).year()));
    regressors.push(Regressor::new(
        LOG_SUBSIDY,
        sample.iter().map(|a| a.subsidy_per_watt.ln()).collect(),
    ));
    regressors.push(Regressor::constant(sample.len()));
    regressors.push(Regressor::new(
        "trend",
        sample
            .iter()
            .map(|a| days_since_epoch(a.receipt_month))
            .collect(),
    ));
    regressors
}

/// Calendar days from 1970-01-01, a linear rescale of the month-start timestamp.
fn days_since_epoch(date: NaiveDate) -> f64 {
    // NaiveDate::default() is 1970-01-01
    (date - NaiveDate::default()).num_days() as f64
}

/// Indicator columns for every level but the lowest.
fn dummies(
    prefix: &str,
    sample: &[&Application],
    level: impl Fn(&Application) -> i32,
) -> Vec<Regressor> {
    let levels: BTreeSet<i32> = sample.iter().map(|&a| level(a)).collect();
    levels
        .into_iter()
        .skip(1)
        .map(|l| {
            Regressor::new(
                format!("{prefix}_{l}"),
                sample
                    .iter()
                    .map(|&a| if level(a) == l { 1.0 } else { 0.0 })
                    .collect(),
            )
        })
        .collect()
}

fn histogram(jurisdiction: &Jurisdiction, sample: &[&Application]) -> ReceiptHistogram {
    let mut bins: BTreeMap<NaiveDate, HistogramBin> = BTreeMap::new();
    for a in sample {
        let per_kw = a.subsidy_per_watt * 1000.0;
        let bin = bins.entry(a.receipt_month).or_insert(HistogramBin {
            month: a.receipt_month,
            applications: 0,
            min_subsidy_per_kw: per_kw,
            max_subsidy_per_kw: per_kw,
        });
        bin.applications += 1;
        bin.min_subsidy_per_kw = bin.min_subsidy_per_kw.min(per_kw);
        bin.max_subsidy_per_kw = bin.max_subsidy_per_kw.max(per_kw);
    }
    ReceiptHistogram {
        jurisdiction: jurisdiction.clone(),
        bins: bins.into_values().collect(),
    }
}
