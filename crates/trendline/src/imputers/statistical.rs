//! Statistical imputation methods.
//!
//! Provides mean, median and mode fills for the value column.

use crate::profiler::statistics;
use crate::utils::fill_numeric_nulls;
use anyhow::{Result, anyhow};
use polars::prelude::*;

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Fill nulls with the mean of the present values. Returns the fill value.
    pub fn apply_numeric_mean(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<f64> {
        Self::apply_with(df, col_name, processing_steps, "mean", |series| series.mean())
    }

    /// Fill nulls with the median of the present values. Returns the fill value.
    pub fn apply_numeric_median(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<f64> {
        Self::apply_with(df, col_name, processing_steps, "median", |series| {
            series.median()
        })
    }

    /// Fill nulls with the mode of the present values, first occurrence
    /// winning ties. Returns the fill value.
    pub fn apply_numeric_mode(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<f64> {
        Self::apply_with(df, col_name, processing_steps, "mode", |series| {
            let present: Vec<f64> = series.f64().ok()?.into_iter().flatten().collect();
            statistics::mode(&present)
        })
    }

    fn apply_with(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
        label: &str,
        statistic: fn(&Series) -> Option<f64>,
    ) -> Result<f64> {
        let series = df
            .column(col_name)
            .map_err(|_| anyhow!("Column '{}' not found", col_name))?
            .as_materialized_series()
            .clone();

        let fill_value = statistic(&series)
            .ok_or_else(|| anyhow!("No values to compute the {} of '{}'", label, col_name))?;

        let missing = series.null_count();
        let filled = fill_numeric_nulls(&series, fill_value)?;
        df.replace(col_name, filled)?;

        processing_steps.push(format!(
            "Filled {} missing values in '{}' with {}: {}",
            missing, col_name, label, fill_value
        ));
        Ok(fill_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::series_f64;

    fn values(df: &DataFrame) -> Vec<Option<f64>> {
        series_f64(df.column("y").unwrap().as_materialized_series()).unwrap()
    }

    #[test]
    fn test_apply_numeric_median() {
        let mut df = df!["y" => [Some(10.0), None, Some(12.0)]].unwrap();
        let mut steps = Vec::new();

        let fill = StatisticalImputer::apply_numeric_median(&mut df, "y", &mut steps).unwrap();
        assert_eq!(fill, 11.0);
        assert_eq!(values(&df), vec![Some(10.0), Some(11.0), Some(12.0)]);
        assert_eq!(steps.len(), 1);
        assert!(steps[0].contains("median"));
    }

    #[test]
    fn test_apply_numeric_mean() {
        let mut df = df!["y" => [Some(1.0), None, Some(2.0), None, Some(6.0)]].unwrap();
        let mut steps = Vec::new();

        StatisticalImputer::apply_numeric_mean(&mut df, "y", &mut steps).unwrap();
        assert_eq!(
            values(&df),
            vec![Some(1.0), Some(3.0), Some(2.0), Some(3.0), Some(6.0)]
        );
    }

    #[test]
    fn test_apply_numeric_mode_tie_break() {
        let mut df = df!["y" => [Some(4.0), Some(9.0), None, Some(9.0), Some(4.0)]].unwrap();
        let mut steps = Vec::new();

        let fill = StatisticalImputer::apply_numeric_mode(&mut df, "y", &mut steps).unwrap();
        assert_eq!(fill, 4.0);
    }

    #[test]
    fn test_apply_on_all_missing_fails() {
        let mut df = df!["y" => [None::<f64>, None]].unwrap();
        let mut steps = Vec::new();
        assert!(StatisticalImputer::apply_numeric_mean(&mut df, "y", &mut steps).is_err());
        assert!(steps.is_empty());
    }

    #[test]
    fn test_apply_missing_column() {
        let mut df = df!["y" => [1.0]].unwrap();
        let mut steps = Vec::new();
        assert!(StatisticalImputer::apply_numeric_median(&mut df, "x", &mut steps).is_err());
    }
}
