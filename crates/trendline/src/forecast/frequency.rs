//! Observation spacing inferred from the timestamps.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Granularity of a series, inferred from the modal gap between
/// consecutive timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Spacing {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
    /// Any other fixed gap, in days.
    Days(u32),
}

impl Spacing {
    /// Infer the spacing of ascending dates. Duplicate dates are ignored;
    /// fewer than two distinct dates is treated as daily.
    pub fn detect(sorted: &[NaiveDate]) -> Self {
        let mut gaps: Vec<i64> = sorted
            .windows(2)
            .map(|w| (w[1] - w[0]).num_days())
            .filter(|&d| d > 0)
            .collect();
        if gaps.is_empty() {
            return Spacing::Daily;
        }
        gaps.sort_unstable();

        // Mode of the sorted gaps; smallest gap wins ties
        let mut best = (gaps[0], 0usize);
        let mut current = (gaps[0], 0usize);
        for &gap in &gaps {
            if gap == current.0 {
                current.1 += 1;
            } else {
                current = (gap, 1);
            }
            if current.1 > best.1 {
                best = current;
            }
        }

        Self::from_gap(best.0)
    }

    fn from_gap(days: i64) -> Self {
        match days {
            1 => Spacing::Daily,
            7 => Spacing::Weekly,
            28..=31 => Spacing::Monthly,
            89..=92 => Spacing::Quarterly,
            365 | 366 => Spacing::Yearly,
            d => Spacing::Days(u32::try_from(d).unwrap_or(u32::MAX)),
        }
    }

    /// Default seasonal period in observations, if the spacing has one.
    pub fn seasonal_period(&self) -> Option<usize> {
        match self {
            Spacing::Daily => Some(7),
            Spacing::Weekly => Some(52),
            Spacing::Monthly => Some(12),
            Spacing::Quarterly => Some(4),
            Spacing::Yearly | Spacing::Days(_) => None,
        }
    }

    /// The date `steps` periods after `from`. Month-based spacings step by
    /// calendar months.
    pub fn step(&self, from: NaiveDate, steps: u32) -> Option<NaiveDate> {
        match self {
            Spacing::Daily => from.checked_add_days(Days::new(u64::from(steps))),
            Spacing::Weekly => from.checked_add_days(Days::new(7 * u64::from(steps))),
            Spacing::Days(d) => from.checked_add_days(Days::new(u64::from(*d) * u64::from(steps))),
            Spacing::Monthly => from.checked_add_months(Months::new(steps)),
            Spacing::Quarterly => from.checked_add_months(Months::new(3 * steps)),
            Spacing::Yearly => from.checked_add_months(Months::new(12 * steps)),
        }
    }
}
