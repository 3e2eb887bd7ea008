//! California Solar Initiative interconnection panel: cleaning, monthly
//! aggregation, and subsidy/productivity regressions.

pub mod cli;
pub mod config;
/// Cutoff loading, record cleaning, and panel building.
pub mod data;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod regression;

pub use error::{PipelineError, PipelineResult};
