//! Data preparation: cutoff schedules, application cleaning, and the monthly panel.

pub mod cleaner;
/// Cutoff table loading.
pub mod cutoffs;
pub mod jurisdiction;
pub mod missing;
pub mod panel;
/// Raw and cleaned application rows.
pub mod records;
pub mod schedule;

pub use cleaner::{CleanOptions, CleanStats, CleanedRecords, clean};
pub use cutoffs::load_schedules;
pub use jurisdiction::Jurisdiction;
pub use panel::{MonthlyPanel, PanelEntry, build_panel};
pub use records::{Application, RawApplication, RawTable, read_applications};
pub use schedule::{ScheduleEntry, SubsidySchedule};
