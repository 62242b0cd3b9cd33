//! Numeric primitives over the non-missing values of a column.
//!
//! All functions return `None` when the statistic is undefined for the input.

use std::collections::HashMap;

/// Multiplier of the IQR used for the outlier fences.
pub(crate) const IQR_MULTIPLIER: f64 = 1.5;

/// Arithmetic mean.
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Middle value, or the average of the two middle values for even counts.
pub(crate) fn median(values: &[f64]) -> Option<f64> {
    let sorted = sorted_copy(values);
    quantile_sorted(&sorted, 0.5)
}

/// Most frequent value. Ties go to the value whose first occurrence comes
/// earliest in `values`.
pub(crate) fn mode(values: &[f64]) -> Option<f64> {
    // Keyed by bit pattern; -0.0 and 0.0 count as the same value
    let mut counts: HashMap<u64, (usize, usize)> = HashMap::new();
    for (idx, &v) in values.iter().enumerate() {
        let key = if v == 0.0 { 0.0f64 } else { v }.to_bits();
        counts.entry(key).or_insert((idx, 0)).1 += 1;
    }

    counts
        .into_values()
        .max_by(|(first_a, count_a), (first_b, count_b)| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(first, _)| values[first])
}

/// Linear-interpolation quantile of an ascending slice: `h = (n - 1) * p`.
pub(crate) fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&p) {
        return None;
    }
    let h = (sorted.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    Some(sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo]))
}

/// Quartiles and fences of the IQR rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct IqrFences {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrFences {
    pub(crate) fn compute(values: &[f64]) -> Option<Self> {
        let sorted = sorted_copy(values);
        let q1 = quantile_sorted(&sorted, 0.25)?;
        let q3 = quantile_sorted(&sorted, 0.75)?;
        let iqr = q3 - q1;
        Some(Self {
            q1,
            q3,
            iqr,
            lower: q1 - IQR_MULTIPLIER * iqr,
            upper: q3 + IQR_MULTIPLIER * iqr,
        })
    }

    /// Strictly outside the fences.
    #[inline]
    pub(crate) fn is_outlier(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }
}

/// Sample standard deviation (n - 1 denominator). Needs two values.
pub(crate) fn sample_std(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (n - 1) as f64).sqrt())
}

/// Central moments m2, m3, m4 with a 1/n denominator.
fn central_moments(values: &[f64]) -> Option<(f64, f64, f64)> {
    let n = values.len() as f64;
    let m = mean(values)?;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for v in values {
        let d = v - m;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    Some((m2 / n, m3 / n, m4 / n))
}

/// Bias-corrected sample skewness (G1). Needs three values and non-zero
/// variance.
pub(crate) fn skewness(values: &[f64]) -> Option<f64> {
    let n = values.len() as f64;
    if values.len() < 3 {
        return None;
    }
    let (m2, m3, _) = central_moments(values)?;
    if m2 <= f64::EPSILON * f64::EPSILON {
        return None;
    }
    let g1 = m3 / m2.powf(1.5);
    Some(g1 * (n * (n - 1.0)).sqrt() / (n - 2.0))
}

/// Bias-corrected excess kurtosis (G2). Needs four values and non-zero
/// variance.
pub(crate) fn excess_kurtosis(values: &[f64]) -> Option<f64> {
    let n = values.len() as f64;
    if values.len() < 4 {
        return None;
    }
    let (m2, _, m4) = central_moments(values)?;
    if m2 <= f64::EPSILON * f64::EPSILON {
        return None;
    }
    let g2 = m4 / (m2 * m2) - 3.0;
    Some(((n + 1.0) * g2 + 6.0) * (n - 1.0) / ((n - 2.0) * (n - 3.0)))
}

/// Trailing rolling mean. Position `i` is `None` until `window` values are
/// available, and whenever the window contains a missing value.
pub(crate) fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let sum = slice.iter().copied().sum::<Option<f64>>()?;
            Some(sum / window as f64)
        })
        .collect()
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}
