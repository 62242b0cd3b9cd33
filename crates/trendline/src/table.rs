//! The two-column working table and the column selection stage.

use crate::error::{PipelineError, Result};
use crate::types::ColumnRole;
use crate::utils::{series_dates, series_f64};
use chrono::NaiveDate;
use polars::prelude::*;
use tracing::info;

/// A table narrowed to exactly two columns: one TIMESTAMP and one VALUE.
///
/// The wrapper is owned by the pipeline and mutated in place by the stages;
/// the role names never change after selection.
#[derive(Debug, Clone)]
pub struct WorkingTable {
    df: DataFrame,
    timestamp: String,
    value: String,
}

impl WorkingTable {
    pub(crate) fn new(df: DataFrame, timestamp: String, value: String) -> Self {
        Self {
            df,
            timestamp,
            value,
        }
    }

    /// Borrow the underlying `DataFrame`.
    pub fn data(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    pub fn timestamp_name(&self) -> &str {
        &self.timestamp
    }

    pub fn value_name(&self) -> &str {
        &self.value
    }

    /// Name of the column that plays `role`.
    pub fn column_name(&self, role: ColumnRole) -> &str {
        match role {
            ColumnRole::Timestamp => &self.timestamp,
            ColumnRole::Value => &self.value,
        }
    }

    /// The column that plays `role`.
    pub fn column(&self, role: ColumnRole) -> Result<&Series> {
        let name = self.column_name(role);
        self.df
            .column(name)
            .map(|c| c.as_materialized_series())
            .map_err(|_| PipelineError::ColumnNotFound(name.to_string()))
    }

    /// Value column as optional floats; missing entries are `None`.
    ///
    /// Requires the value column to be numeric (after `correct()`).
    pub fn values(&self) -> Result<Vec<Option<f64>>> {
        let series = self.column(ColumnRole::Value)?;
        if !crate::utils::is_numeric_dtype(series.dtype()) {
            return Err(PipelineError::NotReady(format!(
                "value column '{}' is stored as {}; run format correction first",
                self.value,
                series.dtype()
            )));
        }
        Ok(series_f64(series)?)
    }

    /// Timestamp column as calendar dates.
    ///
    /// Requires the timestamp column to be a date (after `correct()`).
    pub fn timestamps(&self) -> Result<Vec<Option<NaiveDate>>> {
        let series = self.column(ColumnRole::Timestamp)?;
        if series.dtype() != &DataType::Date {
            return Err(PipelineError::NotReady(format!(
                "timestamp column '{}' is stored as {}; run format correction first",
                self.timestamp,
                series.dtype()
            )));
        }
        Ok(series_dates(series)?)
    }

    /// Replace the column playing `role`. The series is renamed to the role's
    /// column name.
    pub(crate) fn replace_column(&mut self, role: ColumnRole, mut series: Series) -> Result<()> {
        let name = self.column_name(role).to_string();
        series.rename(name.as_str().into());
        self.df.replace(&name, series)?;
        Ok(())
    }

    /// Keep only the rows where `mask` is true.
    pub(crate) fn retain_rows(&mut self, mask: &[bool]) -> Result<()> {
        let mask = BooleanChunked::from_slice("mask".into(), mask);
        self.df = self.df.filter(&mask)?;
        Ok(())
    }
}

/// Narrows a loaded table to the TIMESTAMP and VALUE columns.
pub struct ColumnSelector;

impl ColumnSelector {
    /// Project `df` onto the two named columns, tagging them TIMESTAMP and
    /// VALUE respectively.
    pub fn select(df: &DataFrame, timestamp: &str, value: &str) -> Result<WorkingTable> {
        for name in [timestamp, value] {
            if df.get_column_index(name).is_none() {
                return Err(PipelineError::ColumnNotFound(name.to_string()));
            }
        }

        if timestamp == value {
            return Err(PipelineError::InvalidSelection(format!(
                "column '{}' cannot be both timestamp and value",
                timestamp
            )));
        }

        let projected = df.select([timestamp, value])?;
        info!(
            "Selected timestamp column '{}' and value column '{}' ({} columns discarded)",
            timestamp,
            value,
            df.width() - 2
        );

        Ok(WorkingTable::new(
            projected,
            timestamp.to_string(),
            value.to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_df() -> DataFrame {
        df![
            "region" => ["north", "south", "east"],
            "date" => ["2024-01-01", "2024-01-02", "2024-01-03"],
            "sales" => ["10", "Null", "12"]
        ]
        .unwrap()
    }

    #[test]
    fn test_select_projects_two_columns() {
        let table = ColumnSelector::select(&raw_df(), "date", "sales").unwrap();

        assert_eq!(table.data().width(), 2);
        assert_eq!(table.height(), 3);
        assert_eq!(table.timestamp_name(), "date");
        assert_eq!(table.value_name(), "sales");
        assert_eq!(table.column_name(ColumnRole::Value), "sales");
        assert_eq!(
            table
                .data()
                .get_column_names()
                .iter()
                .map(|n| n.as_str())
                .collect::<Vec<_>>(),
            vec!["date", "sales"]
        );
    }

    #[test]
    fn test_select_column_order_follows_roles() {
        let df = df![
            "value" => ["1"],
            "when" => ["2024-01-01"]
        ]
        .unwrap();
        let table = ColumnSelector::select(&df, "when", "value").unwrap();
        assert_eq!(table.data().get_columns()[0].name().as_str(), "when");
    }

    #[test]
    fn test_select_unknown_column() {
        let err = ColumnSelector::select(&raw_df(), "date", "revenue").unwrap_err();
        assert!(matches!(err, PipelineError::ColumnNotFound(ref name) if name == "revenue"));

        let err = ColumnSelector::select(&raw_df(), "day", "sales").unwrap_err();
        assert!(matches!(err, PipelineError::ColumnNotFound(ref name) if name == "day"));
    }

    #[test]
    fn test_select_same_column_twice() {
        let err = ColumnSelector::select(&raw_df(), "date", "date").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidSelection(_)));
    }

    #[test]
    fn test_values_require_numeric_column() {
        let table = ColumnSelector::select(&raw_df(), "date", "sales").unwrap();
        assert!(matches!(
            table.values().unwrap_err(),
            PipelineError::NotReady(_)
        ));
        assert!(matches!(
            table.timestamps().unwrap_err(),
            PipelineError::NotReady(_)
        ));
    }

    #[test]
    fn test_retain_rows() {
        let mut table = ColumnSelector::select(&raw_df(), "date", "sales").unwrap();
        table.retain_rows(&[true, false, true]).unwrap();
        assert_eq!(table.height(), 2);
    }
}
