//! Deterministic coercion of the working columns to their canonical types.

use super::converters::{to_date_series, to_float_series};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::table::WorkingTable;
use crate::types::{ColumnRole, CorrectionSummary};
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Coerces TIMESTAMP to `Date` and VALUE to `Float64`.
#[derive(Debug, Clone)]
pub struct FormatCorrector {
    null_token: String,
    quote_chars: Vec<char>,
}

impl Default for FormatCorrector {
    fn default() -> Self {
        Self::new("Null", vec!['"', '\''])
    }
}

impl FormatCorrector {
    pub fn new(null_token: impl Into<String>, quote_chars: Vec<char>) -> Self {
        Self {
            null_token: null_token.into(),
            quote_chars,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.null_token.clone(), config.quote_chars.clone())
    }

    /// Correct both columns in place.
    ///
    /// A single unparsable timestamp aborts the whole operation, as does a
    /// value column with no usable entry left after coercion. Either way the
    /// table is left untouched. Running `correct` on an already corrected
    /// table yields the identical table.
    pub fn correct(&self, table: &mut WorkingTable) -> Result<CorrectionSummary> {
        let timestamp = table.column(ColumnRole::Timestamp)?;
        let value = table.column(ColumnRole::Value)?;
        let already_typed =
            timestamp.dtype() == &DataType::Date && value.dtype() == &DataType::Float64;

        info!(
            "Correcting formats of '{}' and '{}' ({} rows)",
            table.timestamp_name(),
            table.value_name(),
            table.height()
        );

        let dates = to_date_series(timestamp, &self.quote_chars).map_err(|e| {
            PipelineError::FormatCorrection(format!(
                "timestamp column '{}': {}",
                table.timestamp_name(),
                e
            ))
        })?;

        let coercion = to_float_series(value, &self.null_token, &self.quote_chars).map_err(|e| {
            PipelineError::FormatCorrection(format!("value column '{}': {}", table.value_name(), e))
        })?;

        if coercion.series.null_count() == coercion.series.len() {
            return Err(PipelineError::FormatCorrection(format!(
                "value column '{}' has no usable numeric values",
                table.value_name()
            )));
        }

        let summary = CorrectionSummary {
            rows: table.height(),
            coerced_to_missing: coercion.coerced_to_missing,
            null_tokens: coercion.null_tokens,
            already_missing: coercion.already_missing,
            already_typed,
        };

        table.replace_column(ColumnRole::Timestamp, dates)?;
        table.replace_column(ColumnRole::Value, coercion.series)?;

        if summary.coerced_to_missing > 0 {
            warn!(
                "{} values in '{}' could not be parsed and are now missing",
                summary.coerced_to_missing,
                table.value_name()
            );
        }
        debug!(
            "Correction complete: {} null tokens, {} values missing in total",
            summary.null_tokens,
            summary.missing_values()
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnSelector;
    use crate::utils::{series_dates, series_f64};
    use chrono::NaiveDate;

    fn table(dates: &[&str], values: &[Option<&str>]) -> WorkingTable {
        let df = df![
            "date" => dates,
            "value" => values
        ]
        .unwrap();
        ColumnSelector::select(&df, "date", "value").unwrap()
    }

    #[test]
    fn test_correct_null_token_example() {
        let mut t = table(
            &["2024-01-01", "2024-01-02", "2024-01-03"],
            &[Some("10"), Some("Null"), Some("12")],
        );

        let summary = FormatCorrector::default().correct(&mut t).unwrap();

        assert_eq!(
            t.values().unwrap(),
            vec![Some(10.0), None, Some(12.0)]
        );
        assert_eq!(
            t.timestamps().unwrap()[0],
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
        assert_eq!(summary.null_tokens, 1);
        assert_eq!(summary.rows, 3);
        assert!(!summary.already_typed);
    }

    #[test]
    fn test_correct_normalizes_mixed_dates() {
        let mut t = table(
            &["01/15/2024", "2024-01-16", "Jan 17, 2024"],
            &[Some("1"), Some("2"), Some("3")],
        );
        FormatCorrector::default().correct(&mut t).unwrap();

        let dates = series_dates(t.column(ColumnRole::Timestamp).unwrap()).unwrap();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 15),
                NaiveDate::from_ymd_opt(2024, 1, 16),
                NaiveDate::from_ymd_opt(2024, 1, 17)
            ]
        );
    }

    #[test]
    fn test_correct_is_idempotent() {
        let mut t = table(
            &["2024-01-01", "2024-01-02", "2024-01-03"],
            &[Some("\"5\""), Some("oops"), Some(" 7 ")],
        );
        let corrector = FormatCorrector::default();
        corrector.correct(&mut t).unwrap();
        let first = t.data().clone();

        let summary = corrector.correct(&mut t).unwrap();
        assert!(summary.already_typed);
        assert!(t.data().equals_missing(&first));
    }

    #[test]
    fn test_correct_fails_on_unparsable_timestamp() {
        let mut t = table(
            &["2024-01-01", "someday", "2024-01-03"],
            &[Some("1"), Some("2"), Some("3")],
        );
        let before = t.data().clone();

        let err = FormatCorrector::default().correct(&mut t).unwrap_err();
        assert!(matches!(err, PipelineError::FormatCorrection(_)));
        assert!(err.to_string().contains("someday"));
        // Table untouched
        assert!(t.data().equals_missing(&before));
    }

    #[test]
    fn test_correct_fails_when_all_values_missing() {
        let mut t = table(
            &["2024-01-01", "2024-01-02"],
            &[Some("Null"), Some("n/a")],
        );
        let err = FormatCorrector::default().correct(&mut t).unwrap_err();
        assert!(matches!(err, PipelineError::FormatCorrection(_)));
        assert_eq!(
            t.column(ColumnRole::Value).unwrap().dtype(),
            &DataType::String
        );
    }

    #[test]
    fn test_correct_custom_null_token() {
        let mut t = table(
            &["2024-01-01", "2024-01-02"],
            &[Some("NA"), Some("4")],
        );
        let summary = FormatCorrector::new("NA", vec!['"'])
            .correct(&mut t)
            .unwrap();
        assert_eq!(summary.null_tokens, 1);
        assert_eq!(
            series_f64(t.column(ColumnRole::Value).unwrap()).unwrap(),
            vec![None, Some(4.0)]
        );
    }
}
