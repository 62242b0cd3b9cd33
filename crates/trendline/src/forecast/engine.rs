//! The forecasting collaborator seam and its canonical input.

use crate::error::{PipelineError, Result};
use crate::table::WorkingTable;
use crate::utils::{date_series, series_dates, series_f64};
use chrono::NaiveDate;
use polars::prelude::*;

/// Column names of the engine output that the adapter exposes.
pub const DS: &str = "ds";
pub const Y: &str = "y";
pub const YHAT: &str = "yhat";
pub const YHAT_LOWER: &str = "yhat_lower";
pub const YHAT_UPPER: &str = "yhat_upper";
pub const TREND: &str = "trend";
pub const SEASONAL: &str = "seasonal";

/// A black-box additive time series model.
///
/// `predict` returns one row per historical timestamp followed by one row per
/// future period, with at least the columns `ds`, `yhat`, `yhat_lower`,
/// `yhat_upper`, `trend` and `seasonal`. Engines may add further columns.
pub trait ForecastEngine {
    /// Short name for logs and reports.
    fn name(&self) -> &str;

    /// Fit the model to the history.
    fn fit(&mut self, history: &CanonicalSeries) -> Result<()>;

    /// Predict the history plus `horizon` future periods.
    fn predict(&self, horizon: usize) -> Result<DataFrame>;
}

/// The fixed two-column `(ds, y)` table the engine consumes, sorted by `ds`.
///
/// Missing values stay null in the table and surface as `NaN` through
/// [`CanonicalSeries::values`].
#[derive(Debug, Clone)]
pub struct CanonicalSeries {
    df: DataFrame,
}

impl CanonicalSeries {
    /// Reshape a corrected working table into the canonical schema.
    ///
    /// Rows are stably sorted by timestamp.
    pub fn from_table(table: &WorkingTable) -> Result<Self> {
        let timestamps = table.timestamps()?;
        let values = table.values()?;

        let mut rows: Vec<(NaiveDate, Option<f64>)> = Vec::with_capacity(timestamps.len());
        for (row, (ts, value)) in timestamps.into_iter().zip(values).enumerate() {
            let ts = ts.ok_or_else(|| {
                PipelineError::NotReady(format!("row {} has no timestamp", row))
            })?;
            rows.push((ts, value));
        }
        rows.sort_by_key(|(ts, _)| *ts);

        let dates: Vec<Option<NaiveDate>> = rows.iter().map(|(ts, _)| Some(*ts)).collect();
        let ys: Vec<Option<f64>> = rows.iter().map(|(_, y)| *y).collect();
        Self::from_parts(&dates, ys)
    }

    /// Build from parallel columns that are already in chronological order.
    pub(crate) fn from_parts(dates: &[Option<NaiveDate>], values: Vec<Option<f64>>) -> Result<Self> {
        let ds = date_series(DS, dates)?;
        let y = Series::new(Y.into(), values);
        let df = DataFrame::new(vec![ds.into(), y.into()])?;
        Ok(Self { df })
    }

    pub fn data(&self) -> &DataFrame {
        &self.df
    }

    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Timestamps in ascending order.
    pub fn dates(&self) -> Result<Vec<NaiveDate>> {
        let series = self.df.column(DS)?.as_materialized_series();
        Ok(series_dates(series)?.into_iter().flatten().collect())
    }

    /// Observed values with missing entries as `NaN`.
    pub fn values(&self) -> Result<Vec<f64>> {
        let series = self.df.column(Y)?.as_materialized_series();
        Ok(series_f64(series)?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect())
    }

    /// Number of non-missing observations.
    pub fn observed(&self) -> usize {
        self.df
            .column(Y)
            .map(|c| c.len() - c.null_count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::FormatCorrector;
    use crate::table::ColumnSelector;

    #[test]
    fn test_canonical_series_sorts_by_timestamp() {
        let df = df![
            "when" => ["2024-01-03", "2024-01-01", "2024-01-02"],
            "amount" => ["30", "Null", "20"]
        ]
        .unwrap();
        let mut table = ColumnSelector::select(&df, "when", "amount").unwrap();
        FormatCorrector::default().correct(&mut table).unwrap();

        let canonical = CanonicalSeries::from_table(&table).unwrap();
        assert_eq!(
            canonical
                .data()
                .get_column_names()
                .iter()
                .map(|n| n.as_str())
                .collect::<Vec<_>>(),
            vec!["ds", "y"]
        );
        assert_eq!(
            canonical.dates().unwrap(),
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()
            ]
        );

        let values = canonical.values().unwrap();
        assert!(values[0].is_nan());
        assert_eq!(&values[1..], &[20.0, 30.0]);
        assert_eq!(canonical.observed(), 2);

        // Source table keeps its order
        assert_eq!(table.values().unwrap()[0], Some(30.0));
    }

    #[test]
    fn test_canonical_series_requires_corrected_table() {
        let df = df![
            "when" => ["2024-01-01"],
            "amount" => ["1"]
        ]
        .unwrap();
        let table = ColumnSelector::select(&df, "when", "amount").unwrap();
        assert!(matches!(
            CanonicalSeries::from_table(&table).unwrap_err(),
            PipelineError::NotReady(_)
        ));
    }
}
