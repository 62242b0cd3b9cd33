//! Bridges the working table and a [`ForecastEngine`].

use super::engine::{
    CanonicalSeries, DS, ForecastEngine, SEASONAL, TREND, YHAT, YHAT_LOWER, YHAT_UPPER,
};
use crate::error::{PipelineError, Result, ResultExt};
use crate::table::WorkingTable;
use crate::utils::{date_series, series_dates, series_f64};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One row of the forecast output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub timestamp: NaiveDate,
    pub point_estimate: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub trend: f64,
    pub seasonal: f64,
}

/// Forecast covering the history followed by the requested future periods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResult {
    pub rows: Vec<ForecastRow>,
    pub history_len: usize,
    pub horizon: usize,
}

impl ForecastResult {
    /// The last `n` rows, or all of them when fewer exist.
    pub fn tail(&self, n: usize) -> &[ForecastRow] {
        let start = self.rows.len().saturating_sub(n);
        &self.rows[start..]
    }

    /// Rows past the end of the history.
    pub fn future(&self) -> &[ForecastRow] {
        let start = self.history_len.min(self.rows.len());
        &self.rows[start..]
    }

    /// The six output columns as a table.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let dates: Vec<Option<NaiveDate>> = self.rows.iter().map(|r| Some(r.timestamp)).collect();
        let ds = date_series(DS, &dates)?;
        let column = |name: &str, f: fn(&ForecastRow) -> f64| {
            Series::new(name.into(), self.rows.iter().map(f).collect::<Vec<f64>>())
        };

        let df = DataFrame::new(vec![
            ds.into(),
            column(YHAT, |r| r.point_estimate).into(),
            column(YHAT_LOWER, |r| r.lower_bound).into(),
            column(YHAT_UPPER, |r| r.upper_bound).into(),
            column(TREND, |r| r.trend).into(),
            column(SEASONAL, |r| r.seasonal).into(),
        ])?;
        Ok(df)
    }
}

/// Holds the horizon and drives a forecasting engine.
pub struct ForecastAdapter {
    engine: Box<dyn ForecastEngine>,
    horizon: Option<usize>,
    history_len: Option<usize>,
}

impl ForecastAdapter {
    pub fn new(engine: Box<dyn ForecastEngine>) -> Self {
        Self {
            engine,
            horizon: None,
            history_len: None,
        }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    pub fn horizon(&self) -> Option<usize> {
        self.horizon
    }

    pub fn is_fitted(&self) -> bool {
        self.history_len.is_some()
    }

    /// Set the number of future periods. Must be positive.
    pub fn set_horizon(&mut self, periods: i64) -> Result<()> {
        if periods <= 0 {
            return Err(PipelineError::InvalidHorizon(periods));
        }
        let periods = usize::try_from(periods).map_err(|_| PipelineError::InvalidHorizon(periods))?;
        debug!("Forecast horizon set to {} periods", periods);
        self.horizon = Some(periods);
        Ok(())
    }

    /// Forget the last fit. The horizon is kept.
    pub(crate) fn invalidate(&mut self) {
        if self.history_len.take().is_some() {
            debug!("Forecast fit invalidated by a table mutation");
        }
    }

    /// Reshape the working table into the engine's `(ds, y)` schema.
    pub fn prepare(table: &WorkingTable) -> Result<CanonicalSeries> {
        CanonicalSeries::from_table(table)
    }

    /// Fit the engine to the corrected working table.
    pub fn fit(&mut self, table: &WorkingTable) -> Result<()> {
        let history = Self::prepare(table)?;
        if history.is_empty() {
            return Err(PipelineError::NotReady(
                "cannot fit a forecast to an empty table".to_string(),
            ));
        }
        self.engine.fit(&history)?;
        self.history_len = Some(history.len());
        info!(
            "Fitted {} to {} rows",
            self.engine.name(),
            history.len()
        );
        Ok(())
    }

    /// Predict the history plus the horizon.
    pub fn forecast(&self) -> Result<ForecastResult> {
        let history_len = self
            .history_len
            .ok_or_else(|| PipelineError::NotReady("forecast model has not been fit".to_string()))?;
        let horizon = self
            .horizon
            .ok_or_else(|| PipelineError::NotReady("forecast horizon is not set".to_string()))?;

        let df = self.engine.predict(horizon)?;
        let rows = Self::extract_rows(&df).context("Failed to read forecast output")?;
        if rows.len() != history_len + horizon {
            return Err(PipelineError::ForecastEngine(format!(
                "expected {} forecast rows, engine returned {}",
                history_len + horizon,
                rows.len()
            )));
        }

        Ok(ForecastResult {
            rows,
            history_len,
            horizon,
        })
    }

    fn extract_rows(df: &DataFrame) -> Result<Vec<ForecastRow>> {
        let number = |name: &str| -> Result<Vec<Option<f64>>> {
            let column = df.column(name).map_err(|_| {
                PipelineError::ForecastEngine(format!("engine output has no '{}' column", name))
            })?;
            Ok(series_f64(column.as_materialized_series())?)
        };

        let dates = {
            let column = df.column(DS).map_err(|_| {
                PipelineError::ForecastEngine(format!("engine output has no '{}' column", DS))
            })?;
            series_dates(column.as_materialized_series())?
        };
        let yhat = number(YHAT)?;
        let lower = number(YHAT_LOWER)?;
        let upper = number(YHAT_UPPER)?;
        let trend = number(TREND)?;
        let seasonal = number(SEASONAL)?;

        let mut rows = Vec::with_capacity(dates.len());
        for (i, date) in dates.into_iter().enumerate() {
            let timestamp = date.ok_or_else(|| {
                PipelineError::ForecastEngine(format!("forecast row {} has no timestamp", i))
            })?;
            let get = |col: &[Option<f64>]| col.get(i).copied().flatten().unwrap_or(f64::NAN);
            rows.push(ForecastRow {
                timestamp,
                point_estimate: get(&yhat),
                lower_bound: get(&lower),
                upper_bound: get(&upper),
                trend: get(&trend),
                seasonal: get(&seasonal),
            });
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::FormatCorrector;
    use crate::table::ColumnSelector;
    use chrono::Days;

    /// Predicts the last observed value with a fixed band.
    struct FlatEngine {
        history: Option<(Vec<NaiveDate>, f64)>,
    }

    impl ForecastEngine for FlatEngine {
        fn name(&self) -> &str {
            "flat"
        }

        fn fit(&mut self, history: &CanonicalSeries) -> Result<()> {
            let dates = history.dates()?;
            let last = history
                .values()?
                .into_iter()
                .filter(|v| !v.is_nan())
                .last()
                .unwrap_or(0.0);
            self.history = Some((dates, last));
            Ok(())
        }

        fn predict(&self, horizon: usize) -> Result<DataFrame> {
            let (dates, level) = self.history.clone().unwrap();
            let last = *dates.last().unwrap();
            let mut all: Vec<Option<NaiveDate>> = dates.into_iter().map(Some).collect();
            all.extend((1..=horizon).map(|i| Some(last + Days::new(i as u64))));
            let n = all.len();
            Ok(DataFrame::new(vec![
                date_series(DS, &all)?.into(),
                Series::new(YHAT.into(), vec![level; n]).into(),
                Series::new(YHAT_LOWER.into(), vec![level - 1.0; n]).into(),
                Series::new(YHAT_UPPER.into(), vec![level + 1.0; n]).into(),
                Series::new(TREND.into(), vec![level; n]).into(),
                Series::new(SEASONAL.into(), vec![0.0; n]).into(),
            ])?)
        }
    }

    fn adapter() -> ForecastAdapter {
        ForecastAdapter::new(Box::new(FlatEngine { history: None }))
    }

    fn table() -> WorkingTable {
        let df = df![
            "date" => ["2024-03-02", "2024-03-01", "2024-03-03"],
            "sales" => ["12", "10", "Null"]
        ]
        .unwrap();
        let mut table = ColumnSelector::select(&df, "date", "sales").unwrap();
        FormatCorrector::default().correct(&mut table).unwrap();
        table
    }

    #[test]
    fn test_set_horizon_rejects_non_positive() {
        let mut adapter = adapter();
        assert!(matches!(
            adapter.set_horizon(0).unwrap_err(),
            PipelineError::InvalidHorizon(0)
        ));
        assert!(matches!(
            adapter.set_horizon(-5).unwrap_err(),
            PipelineError::InvalidHorizon(-5)
        ));
        assert_eq!(adapter.horizon(), None);

        adapter.set_horizon(30).unwrap();
        assert_eq!(adapter.horizon(), Some(30));
    }

    #[test]
    fn test_forecast_requires_fit_and_horizon() {
        let mut adapter = adapter();
        assert!(matches!(
            adapter.forecast().unwrap_err(),
            PipelineError::NotReady(_)
        ));

        adapter.fit(&table()).unwrap();
        assert!(adapter.is_fitted());
        assert!(matches!(
            adapter.forecast().unwrap_err(),
            PipelineError::NotReady(_)
        ));
    }

    #[test]
    fn test_forecast_covers_history_and_horizon() {
        let mut adapter = adapter();
        adapter.set_horizon(2).unwrap();
        adapter.fit(&table()).unwrap();

        let result = adapter.forecast().unwrap();
        assert_eq!(result.rows.len(), 5);
        assert_eq!(result.history_len, 3);
        assert_eq!(result.future().len(), 2);
        assert_eq!(result.tail(1)[0].timestamp, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(result.rows[0].timestamp, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        // Last observed value after sorting is 12
        assert_eq!(result.rows[4].point_estimate, 12.0);
        assert_eq!(result.rows[4].lower_bound, 11.0);

        let df = result.to_dataframe().unwrap();
        assert_eq!(df.height(), 5);
        assert_eq!(df.width(), 6);
    }

    #[test]
    fn test_tail_larger_than_rows() {
        let result = ForecastResult {
            rows: Vec::new(),
            history_len: 0,
            horizon: 0,
        };
        assert!(result.tail(5).is_empty());
        assert!(result.future().is_empty());
    }

    #[test]
    fn test_fit_requires_corrected_table() {
        let df = df!["d" => ["2024-01-01"], "v" => ["1"]].unwrap();
        let table = ColumnSelector::select(&df, "d", "v").unwrap();
        assert!(matches!(
            adapter().fit(&table).unwrap_err(),
            PipelineError::NotReady(_)
        ));
    }
}
