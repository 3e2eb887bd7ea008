//! Per-jurisdiction OLS models on the panel and the cleaned records.

pub mod ols;
pub mod productivity;
pub mod subsidy;
/// Summary table rendering.
pub mod summary;

use chrono::NaiveDate;

use crate::data::{Application, Jurisdiction, MonthlyPanel};
use crate::error::PipelineResult;

pub use ols::{Coefficient, OlsFit, Regressor, fit_ols};
pub use productivity::{FitPoint, FitSeries, ProductivityResult, run_productivity};
pub use subsidy::{ReceiptHistogram, SubsidyResult, run_subsidy};
pub use summary::SummaryTable;

/// Outputs of every regression stage.
#[derive(Debug, Clone)]
pub struct RegressionOutputs {
    pub productivity: Vec<ProductivityResult>,
    pub subsidy: SubsidyResult,
}

/// Runs the productivity models on the panel and the subsidy model on the records.
///
/// # Errors
///
/// Propagates solver failures.
pub fn run_regressions(
    records: &[Application],
    panel: &MonthlyPanel,
    jurisdictions: &[Jurisdiction],
    min_month: NaiveDate,
) -> PipelineResult<RegressionOutputs> {
    let productivity = run_productivity(panel, jurisdictions, min_month)?;
    let subsidy = run_subsidy(records, jurisdictions)?;
    Ok(RegressionOutputs {
        productivity,
        subsidy,
    })
}
