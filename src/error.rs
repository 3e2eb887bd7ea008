//! Error taxonomy for the load, transform, regression, and export stages.

use std::io;

use thiserror::Error;

/// Fatal pipeline failure. Any variant aborts the run.
///
/// Missing data is never an error: absent values travel through the
/// pipeline as `None` and are handled by the aggregation rules.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A source could not be opened, read, or parsed.
    #[error("failed to load {source_name}: {reason}")]
    Load { source_name: String, reason: String },

    /// A source table lacks a column the cleaner depends on.
    #[error("{source_name}: missing expected column \"{column}\"")]
    MissingColumn { source_name: String, column: String },

    /// A quantity-slot column does not belong to the fixed slot layout.
    #[error("{source_name}: column \"{column}\" does not fit the {group} slot layout")]
    AggregationInconsistency {
        source_name: String,
        group: String,
        column: String,
    },

    /// The receipt window end date falls outside the calendar range.
    #[error("receipt window for {jurisdiction} overflows with a grace period of {grace_days} days")]
    InvalidWindow {
        jurisdiction: String,
        grace_days: i64,
    },

    /// A regression could not be fit.
    #[error("regression \"{model}\" failed: {reason}")]
    Regression { model: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl PipelineError {
    pub(crate) fn load(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Load {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
