//! Read-only classification of the working columns.

use super::converters::{is_canonical_date, is_number};
use crate::error::Result;
use crate::table::WorkingTable;
use crate::types::{ColumnRole, FormatDescriptor, FormatReport};
use crate::utils::{is_datetime_dtype, is_numeric_dtype};
use polars::prelude::*;
use tracing::debug;

/// Reports the current semantic type of each working column.
pub struct FormatInspector;

impl FormatInspector {
    /// Classify both columns. Never mutates the table.
    pub fn inspect(table: &WorkingTable) -> Result<FormatReport> {
        let timestamp = table.column(ColumnRole::Timestamp)?;
        let value = table.column(ColumnRole::Value)?;

        let report = FormatReport {
            timestamp: Self::classify(timestamp)?,
            value: Self::classify(value)?,
            timestamp_dtype: timestamp.dtype().to_string(),
            value_dtype: value.dtype().to_string(),
            timestamp_stored_as_date: timestamp.dtype() == &DataType::Date,
            value_stored_as_float: value.dtype() == &DataType::Float64,
        };

        debug!(
            "Inspected formats: {} is {}, {} is {}",
            table.timestamp_name(),
            report.timestamp,
            table.value_name(),
            report.value
        );
        Ok(report)
    }

    /// Classify a single column.
    ///
    /// Typed columns are classified by dtype. A text column is DATE only if
    /// every entry is present and already in `YYYY-MM-DD`, NUMERIC only if
    /// every entry is present and parses as a finite number.
    pub fn classify(series: &Series) -> Result<FormatDescriptor> {
        let dtype = series.dtype();
        if is_datetime_dtype(dtype) {
            return Ok(FormatDescriptor::Date);
        }
        if is_numeric_dtype(dtype) {
            return Ok(FormatDescriptor::Numeric);
        }
        if dtype != &DataType::String || series.is_empty() || series.null_count() > 0 {
            return Ok(FormatDescriptor::Text);
        }

        let text = series.str()?;
        if text.into_iter().flatten().all(is_canonical_date) {
            Ok(FormatDescriptor::Date)
        } else if text.into_iter().flatten().all(is_number) {
            Ok(FormatDescriptor::Numeric)
        } else {
            Ok(FormatDescriptor::Text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnSelector;
    use crate::utils::date_series;
    use chrono::NaiveDate;

    fn table(df: DataFrame) -> WorkingTable {
        ColumnSelector::select(&df, "date", "value").unwrap()
    }

    #[test]
    fn test_inspect_raw_text() {
        let t = table(
            df![
                "date" => ["01/02/2024", "01/03/2024"],
                "value" => ["10", "Null"]
            ]
            .unwrap(),
        );

        let report = FormatInspector::inspect(&t).unwrap();
        assert_eq!(report.timestamp, FormatDescriptor::Text);
        assert_eq!(report.value, FormatDescriptor::Text);
        assert!(report.needs_correction());
    }

    #[test]
    fn test_inspect_text_that_looks_typed() {
        let t = table(
            df![
                "date" => ["2024-01-01", "2024-01-02"],
                "value" => ["10", " 11.5 "]
            ]
            .unwrap(),
        );

        let report = FormatInspector::inspect(&t).unwrap();
        assert_eq!(report.timestamp, FormatDescriptor::Date);
        assert_eq!(report.value, FormatDescriptor::Numeric);
        // Still stored as text
        assert!(!report.is_ready());
    }

    #[test]
    fn test_inspect_typed_columns() {
        let dates = date_series(
            "date",
            &[
                NaiveDate::from_ymd_opt(2024, 1, 1),
                NaiveDate::from_ymd_opt(2024, 1, 2),
            ],
        )
        .unwrap();
        let values = Series::new("value".into(), &[Some(1.0), None]);
        let df = DataFrame::new(vec![dates.into(), values.into()]).unwrap();

        let report = FormatInspector::inspect(&table(df)).unwrap();
        assert_eq!(report.timestamp, FormatDescriptor::Date);
        assert_eq!(report.value, FormatDescriptor::Numeric);
        assert!(report.is_ready());
    }

    #[test]
    fn test_classify_missing_entries_are_text() {
        let series = Series::new("value".into(), &[Some("1"), None]);
        assert_eq!(
            FormatInspector::classify(&series).unwrap(),
            FormatDescriptor::Text
        );
    }

    #[test]
    fn test_classify_integers_are_numeric() {
        let series = Series::new("value".into(), &[1i64, 2, 3]);
        assert_eq!(
            FormatInspector::classify(&series).unwrap(),
            FormatDescriptor::Numeric
        );
    }
}
