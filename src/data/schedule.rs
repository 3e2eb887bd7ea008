//! Point-in-time subsidy schedule.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::jurisdiction::Jurisdiction;

/// One subsidy cutoff: the rate that applies from `effective_date` onward.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleEntry {
    pub jurisdiction: Jurisdiction,
    pub effective_date: NaiveDate,
    /// Subsidy in dollars per watt.
    pub subsidy_per_watt: f64,
}

/// Union of every jurisdiction's cutoff table.
///
/// Entries are kept in load order (no deduplication). A per-jurisdiction
/// index sorted by effective date backs [`SubsidySchedule::resolve`] and
/// [`SubsidySchedule::span`].
#[derive(Debug, Clone, Default)]
pub struct SubsidySchedule {
    entries: Vec<ScheduleEntry>,
    by_jurisdiction: BTreeMap<Jurisdiction, Vec<(NaiveDate, f64)>>,
}

impl SubsidySchedule {
    pub fn from_entries(entries: Vec<ScheduleEntry>) -> Self {
        let mut by_jurisdiction: BTreeMap<Jurisdiction, Vec<(NaiveDate, f64)>> = BTreeMap::new();
        for e in &entries {
            by_jurisdiction
                .entry(e.jurisdiction.clone())
                .or_default()
                .push((e.effective_date, e.subsidy_per_watt));
        }
        // Stable: entries sharing a date keep load order, so the last one loaded wins.
        for cutoffs in by_jurisdiction.values_mut() {
            cutoffs.sort_by_key(|&(date, _)| date);
        }
        Self {
            entries,
            by_jurisdiction,
        }
    }

    /// All entries in load order.
    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Jurisdictions with at least one cutoff, in code order.
    pub fn jurisdictions(&self) -> impl Iterator<Item = &Jurisdiction> {
        self.by_jurisdiction.keys()
    }

    /// Earliest and latest cutoff dates, or `None` for an unknown jurisdiction.
    pub fn span(&self, jurisdiction: &Jurisdiction) -> Option<(NaiveDate, NaiveDate)> {
        let cutoffs = self.by_jurisdiction.get(jurisdiction)?;
        let first = cutoffs.first()?;
        let last = cutoffs.last()?;
        Some((first.0, last.0))
    }

    /// Rate in effect on `date`: the most recent cutoff not after it, or 0.0
    /// when the jurisdiction has no cutoff on or before `date`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use csi_panel::data::{Jurisdiction, ScheduleEntry, SubsidySchedule};
    ///
    /// let x = Jurisdiction::new("x");
    /// let day = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
    /// let schedule = SubsidySchedule::from_entries(vec![
    ///     ScheduleEntry { jurisdiction: x.clone(), effective_date: day(2007, 1, 1), subsidy_per_watt: 0.5 },
    ///     ScheduleEntry { jurisdiction: x.clone(), effective_date: day(2009, 6, 1), subsidy_per_watt: 0.3 },
    /// ]);
    /// assert_eq!(schedule.resolve(&x, day(2008, 1, 1)), 0.5);
    /// assert_eq!(schedule.resolve(&x, day(2006, 1, 1)), 0.0);
    /// ```
    pub fn resolve(&self, jurisdiction: &Jurisdiction, date: NaiveDate) -> f64 {
        self.resolve_cutoff(jurisdiction, date)
            .map_or(0.0, |(_, rate)| rate)
    }

    /// The `(effective_date, rate)` cutoff in force on `date`, if any.
    pub fn resolve_cutoff(
        &self,
        jurisdiction: &Jurisdiction,
        date: NaiveDate,
    ) -> Option<(NaiveDate, f64)> {
        let cutoffs = self.by_jurisdiction.get(jurisdiction)?;
        let idx = cutoffs.partition_point(|&(effective, _)| effective <= date);
        idx.checked_sub(1).map(|i| cutoffs[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
    }

    fn entry(code: &str, date: NaiveDate, rate: f64) -> ScheduleEntry {
        ScheduleEntry {
            jurisdiction: Jurisdiction::new(code),
            effective_date: date,
            subsidy_per_watt: rate,
        }
    }

    fn two_step() -> SubsidySchedule {
        SubsidySchedule::from_entries(vec![
            entry("x", day(2007, 1, 1), 0.50),
            entry("x", day(2009, 6, 1), 0.30),
        ])
    }

    #[test]
    fn resolves_most_recent_cutoff() {
        let s = two_step();
        let x = Jurisdiction::new("x");
        assert_eq!(s.resolve(&x, day(2008, 1, 1)), 0.50);
        assert_eq!(s.resolve(&x, day(2010, 1, 1)), 0.30);
        assert_eq!(s.resolve(&x, day(2006, 1, 1)), 0.0);
    }

    #[test]
    fn cutoff_date_itself_uses_new_rate() {
        let s = two_step();
        assert_eq!(s.resolve(&Jurisdiction::new("x"), day(2009, 6, 1)), 0.30);
        assert_eq!(s.resolve(&Jurisdiction::new("x"), day(2009, 5, 31)), 0.50);
    }

    #[test]
    fn unknown_jurisdiction_resolves_to_zero() {
        let s = two_step();
        assert_eq!(s.resolve(&Jurisdiction::new("y"), day(2008, 1, 1)), 0.0);
        assert!(s.span(&Jurisdiction::new("y")).is_none());
    }

    #[test]
    fn resolution_is_monotonic_in_date() {
        let s = SubsidySchedule::from_entries(vec![
            entry("x", day(2009, 1, 1), 0.9),
            entry("x", day(2007, 1, 1), 2.5),
            entry("x", day(2008, 1, 1), 1.9),
            entry("x", day(2008, 7, 1), 3.1),
            entry("x", day(2009, 6, 1), 1.2),
        ]);
        let x = Jurisdiction::new("x");
        let mut prev: Option<NaiveDate> = None;
        let mut d = day(2006, 6, 1);
        while d < day(2010, 1, 1) {
            let effective = s.resolve_cutoff(&x, d).map(|(date, _)| date);
            assert!(effective >= prev, "{d} fell back from {prev:?} to {effective:?}");
            assert!(effective.is_none_or(|e| e <= d));
            prev = effective;
            d += chrono::Duration::days(17);
        }
        assert_eq!(s.resolve(&x, day(2008, 8, 1)), 3.1);
        assert_eq!(s.resolve(&x, day(2009, 2, 1)), 0.9);
    }

    #[test]
    fn span_covers_unsorted_input() {
        let s = SubsidySchedule::from_entries(vec![
            entry("x", day(2009, 1, 1), 0.9),
            entry("x", day(2007, 1, 1), 2.5),
        ]);
        assert_eq!(
            s.span(&Jurisdiction::new("x")),
            Some((day(2007, 1, 1), day(2009, 1, 1)))
        );
        assert_eq!(s.entries()[0].effective_date, day(2009, 1, 1));
    }

    #[test]
    fn same_day_cutoffs_keep_last_loaded() {
        let s = SubsidySchedule::from_entries(vec![
            entry("x", day(2008, 1, 1), 1.0),
            entry("x", day(2008, 1, 1), 2.0),
        ]);
        assert_eq!(s.resolve(&Jurisdiction::new("x"), day(2008, 2, 1)), 2.0);
        assert_eq!(s.len(), 2);
    }
}
