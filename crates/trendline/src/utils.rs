//! Shared utilities for the time series pipeline.
//!
//! This module contains common helper functions used across multiple modules
//! to reduce code duplication and ensure consistency.

use chrono::NaiveDate;
use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a calendar date or datetime.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Datetime(_, _) | DataType::Date)
}

// =============================================================================
// Date Utilities
// =============================================================================

/// Build a polars `Date` series from optional calendar dates.
pub fn date_series(name: &str, dates: &[Option<NaiveDate>]) -> PolarsResult<Series> {
    Ok(DateChunked::from_naive_date_options(name.into(), dates.iter().copied()).into_series())
}

/// Extract the calendar dates of a date-like series.
pub fn series_dates(series: &Series) -> PolarsResult<Vec<Option<NaiveDate>>> {
    let dates = series.cast(&DataType::Date)?;
    Ok(dates.date()?.as_date_iter().collect())
}

/// Extract the values of a numeric series as optional `f64`.
pub fn series_f64(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let floats = series.cast(&DataType::Float64)?;
    Ok(floats.f64()?.into_iter().collect())
}

/// Format a date in the canonical `YYYY-MM-DD` representation.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

// =============================================================================
// Numeric Utilities
// =============================================================================

/// Round to two decimal places.
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Replace the nulls of a Float64 series with `fill_value`.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let filled: Vec<f64> = series
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(fill_value))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

// =============================================================================
// Display Utilities
// =============================================================================

/// Truncate a string for display, appending "..." when shortened.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Date));
    }

    #[test]
    fn test_is_datetime_dtype() {
        assert!(is_datetime_dtype(&DataType::Date));
        assert!(is_datetime_dtype(&DataType::Datetime(
            TimeUnit::Milliseconds,
            None
        )));
        assert!(!is_datetime_dtype(&DataType::String));
    }

    #[test]
    fn test_date_series_physical_days() {
        let dates = vec![
            NaiveDate::from_ymd_opt(1970, 1, 1),
            NaiveDate::from_ymd_opt(2024, 1, 1),
        ];
        let series = date_series("ds", &dates).unwrap();
        let days = series.cast(&DataType::Int32).unwrap();
        assert_eq!(
            days.i32().unwrap().into_iter().collect::<Vec<_>>(),
            vec![Some(0), Some(19_723)]
        );
    }

    #[test]
    fn test_date_series_roundtrip() {
        let dates = vec![
            NaiveDate::from_ymd_opt(2024, 1, 1),
            None,
            NaiveDate::from_ymd_opt(2024, 2, 29),
        ];
        let series = date_series("ds", &dates).unwrap();
        assert_eq!(series.dtype(), &DataType::Date);
        assert_eq!(series.null_count(), 1);
        assert_eq!(series_dates(&series).unwrap(), dates);
    }

    #[test]
    fn test_fill_numeric_nulls() {
        let series = Series::new("test".into(), &[Some(1.0), None, Some(3.0)]);
        let filled = fill_numeric_nulls(&series, 0.0).unwrap();

        assert_eq!(
            series_f64(&filled).unwrap(),
            vec![Some(1.0), Some(0.0), Some(3.0)]
        );
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(3.14159), 3.14);
        assert_eq!(round2(2.005_1), 2.01);
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("short", 10), "short");
        assert_eq!(truncate_str("a long column name", 10), "a long ...");
    }
}
