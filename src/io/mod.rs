/// CSV and summary-table writers.
pub mod export;
