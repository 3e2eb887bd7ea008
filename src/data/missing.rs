//! Missing-aware arithmetic.
//!
//! A value is either present (`Some`) or missing (`None`). Sums skip missing
//! operands but stay missing when nothing at all was present, which keeps
//! "no data reported" distinct from "zero reported".

/// Running sum that remembers whether any operand was present.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Tally {
    sum: f64,
    present: bool,
}

impl Tally {
    pub fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.present = true;
        }
    }

    /// The sum, or `None` if every operand was missing.
    pub fn value(&self) -> Option<f64> {
        self.present.then_some(self.sum)
    }
}

/// Sums present values; missing when every value is missing (or there are none).
///
/// # Examples
///
/// ```
/// use csi_panel::data::missing::sum_present;
///
/// assert_eq!(sum_present([Some(2.0), None, Some(1.5)]), Some(3.5));
/// assert_eq!(sum_present([None, None]), None);
/// ```
pub fn sum_present<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut tally = Tally::default();
    for v in values {
        tally.add(v);
    }
    tally.value()
}

/// Adds two optional values under the same rule as [`sum_present`].
pub fn add_present(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    sum_present([a, b])
}

/// Maps a NaN read from input to a missing value.
pub fn non_nan(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_missing_stays_missing() {
        assert_eq!(sum_present([None; 5]), None);
        assert_eq!(sum_present(std::iter::empty()), None);
    }

    #[test]
    fn missing_operands_count_as_zero_once_any_present() {
        assert_eq!(sum_present([Some(2.0), None, None, None, None]), Some(2.0));
        assert_eq!(add_present(None, Some(4.0)), Some(4.0));
    }

    #[test]
    fn explicit_zero_is_present() {
        assert_eq!(sum_present([Some(0.0), None]), Some(0.0));
    }

    #[test]
    fn nan_becomes_missing() {
        assert_eq!(non_nan(Some(f64::NAN)), None);
        assert_eq!(non_nan(Some(1.0)), Some(1.0));
    }
}
