//! Panel builder: monthly completed and concurrent load per jurisdiction.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use super::jurisdiction::Jurisdiction;
use super::missing::{Tally, add_present};
use super::records::Application;

/// One (jurisdiction, month) row of the panel.
///
/// `completed_*` sums over applications completed in `month`; `concurrent_*`
/// sums over applications open at any point in `month` (received in or before
/// it, completed in or after it), which includes the completed ones.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelEntry {
    pub jurisdiction: Jurisdiction,
    /// First day of the month.
    pub month: NaiveDate,
    pub completed_size: Option<f64>,
    pub concurrent_size: Option<f64>,
    pub completed_generator_qty: Option<f64>,
    pub concurrent_generator_qty: Option<f64>,
    pub completed_inverter_qty: Option<f64>,
    pub concurrent_inverter_qty: Option<f64>,
    pub completed_total_qty: Option<f64>,
    pub concurrent_total_qty: Option<f64>,
}

/// Panel rows ordered by (jurisdiction, month).
#[derive(Debug, Clone, Default)]
pub struct MonthlyPanel {
    pub entries: Vec<PanelEntry>,
}

impl MonthlyPanel {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, jurisdiction: &Jurisdiction, month: NaiveDate) -> Option<&PanelEntry> {
        self.entries
            .iter()
            .find(|e| &e.jurisdiction == jurisdiction && e.month == month)
    }

    /// Rows of one jurisdiction, in month order.
    pub fn for_jurisdiction<'a>(
        &'a self,
        jurisdiction: &'a Jurisdiction,
    ) -> impl Iterator<Item = &'a PanelEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| &e.jurisdiction == jurisdiction)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Outcomes {
    size: Tally,
    generator: Tally,
    inverter: Tally,
}

impl Outcomes {
    fn add(&mut self, app: &Application) {
        self.size.add(app.size_dc);
        self.generator.add(app.generator_qty);
        self.inverter.add(app.inverter_qty);
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct MonthBucket {
    completed: Outcomes,
    concurrent: Outcomes,
}

/// Builds the monthly panel from cleaned records.
///
/// Panel months are the distinct completion months observed per
/// jurisdiction; records without a completion date take no part. Each record
/// is added to its completion-month bucket and, via binary search over the
/// sorted panel months, to every panel month in
/// `[receipt_month, completion_month]`. Cost is O(R log M) plus one addition
/// per (record, open month) pair.
pub fn build_panel(records: &[Application]) -> MonthlyPanel {
    let mut months: BTreeMap<&Jurisdiction, BTreeSet<NaiveDate>> = BTreeMap::new();
    for app in records {
        if let Some(m) = app.completion_month {
            months.entry(&app.jurisdiction).or_default().insert(m);
        }
    }

    let mut buckets: BTreeMap<&Jurisdiction, (Vec<NaiveDate>, Vec<MonthBucket>)> = months
        .into_iter()
        .map(|(j, set)| {
            let sorted: Vec<NaiveDate> = set.into_iter().collect();
            let acc = vec![MonthBucket::default(); sorted.len()];
            (j, (sorted, acc))
        })
        .collect();

    for app in records {
        let Some(completed) = app.completion_month else {
            continue;
        };
        let Some((sorted, acc)) = buckets.get_mut(&app.jurisdiction) else {
            continue;
        };
        if let Ok(idx) = sorted.binary_search(&completed) {
            acc[idx].completed.add(app);
        }
        let lo = sorted.partition_point(|m| *m < app.receipt_month);
        let hi = sorted.partition_point(|m| *m <= completed);
        for bucket in acc.iter_mut().take(hi).skip(lo) {
            bucket.concurrent.add(app);
        }
    }

    let mut entries = Vec::new();
    for (jurisdiction, (sorted, acc)) in buckets {
        for (month, bucket) in sorted.into_iter().zip(acc) {
            let c = bucket.completed;
            let o = bucket.concurrent;
            entries.push(PanelEntry {
                jurisdiction: jurisdiction.clone(),
                month,
                completed_size: c.size.value(),
                concurrent_size: o.size.value(),
                completed_generator_qty: c.generator.value(),
                concurrent_generator_qty: o.generator.value(),
                completed_inverter_qty: c.inverter.value(),
                concurrent_inverter_qty: o.inverter.value(),
                completed_total_qty: add_present(c.generator.value(), c.inverter.value()),
                concurrent_total_qty: add_present(o.generator.value(), o.inverter.value()),
            });
        }
    }
    log::info!("panel: {} jurisdiction-months", entries.len());
    MonthlyPanel { entries }
}
