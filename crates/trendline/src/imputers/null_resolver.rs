//! Null counting and resolution for the working table.

use super::StatisticalImputer;
use crate::config::NullPolicy;
use crate::error::{PipelineError, Result};
use crate::loader::null_counts;
use crate::table::WorkingTable;
use crate::types::{ColumnRole, NullCounts};
use tracing::{debug, info};

/// Outcome of a single resolution request.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub policy: NullPolicy,
    pub rows_before: usize,
    pub rows_after: usize,
    /// Value substituted for missing entries (fill policies only).
    pub fill_value: Option<f64>,
    pub processing_steps: Vec<String>,
}

/// Reports and resolves missing values in the VALUE column.
pub struct NullResolver;

impl NullResolver {
    /// Null count per column, in column order.
    pub fn count_nulls(table: &WorkingTable) -> NullCounts {
        null_counts(table.data())
    }

    /// Apply exactly one policy across the VALUE column.
    ///
    /// Fill policies over a column with no present value fail with
    /// [`PipelineError::NoValidValues`] and leave the table untouched.
    pub fn resolve(table: &mut WorkingTable, policy: NullPolicy) -> Result<Resolution> {
        // Fails early when the value column is not numeric yet
        let values = table.values()?;
        let rows_before = table.height();
        let missing = values.iter().filter(|v| v.is_none()).count();
        let mut processing_steps = Vec::new();

        info!(
            "Resolving {} missing values in '{}' with policy '{}'",
            missing,
            table.value_name(),
            policy
        );

        let fill_value = match policy {
            NullPolicy::DropRows => {
                let keep: Vec<bool> = values.iter().map(Option::is_some).collect();
                table.retain_rows(&keep)?;
                processing_steps.push(format!(
                    "Dropped {} rows with missing '{}'",
                    rows_before - table.height(),
                    table.value_name()
                ));
                None
            }
            NullPolicy::FillMean | NullPolicy::FillMedian | NullPolicy::FillMode => {
                if missing == values.len() {
                    return Err(PipelineError::NoValidValues(table.value_name().to_string()));
                }

                let name = table.column_name(ColumnRole::Value).to_string();
                let mut df = table.data().clone();
                let fill = match policy {
                    NullPolicy::FillMean => {
                        StatisticalImputer::apply_numeric_mean(&mut df, &name, &mut processing_steps)
                    }
                    NullPolicy::FillMedian => StatisticalImputer::apply_numeric_median(
                        &mut df,
                        &name,
                        &mut processing_steps,
                    ),
                    _ => {
                        StatisticalImputer::apply_numeric_mode(&mut df, &name, &mut processing_steps)
                    }
                }
                .map_err(|e| PipelineError::NoValidValues(format!("{}: {}", name, e)))?;

                let filled = df.column(&name)?.as_materialized_series().clone();
                table.replace_column(ColumnRole::Value, filled)?;
                Some(fill)
            }
        };

        for step in &processing_steps {
            debug!("{}", step);
        }

        Ok(Resolution {
            policy,
            rows_before,
            rows_after: table.height(),
            fill_value,
            processing_steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::FormatCorrector;
    use crate::table::ColumnSelector;
    use polars::prelude::*;

    fn corrected(values: &[&str]) -> WorkingTable {
        let dates: Vec<String> = (1..=values.len())
            .map(|d| format!("2024-01-{:02}", d))
            .collect();
        let df = df![
            "date" => dates,
            "value" => values
        ]
        .unwrap();
        let mut table = ColumnSelector::select(&df, "date", "value").unwrap();
        FormatCorrector::default().correct(&mut table).unwrap();
        table
    }

    #[test]
    fn test_count_nulls_example() {
        let table = corrected(&["10", "Null", "12"]);
        let counts = NullResolver::count_nulls(&table);

        assert_eq!(counts.get("value"), Some(1));
        assert_eq!(counts.get("date"), Some(0));
        assert_eq!(
            counts.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            vec!["date", "value"]
        );
    }

    #[test]
    fn test_resolve_fill_median_example() {
        let mut table = corrected(&["10", "Null", "12"]);
        let resolution = NullResolver::resolve(&mut table, NullPolicy::FillMedian).unwrap();

        assert_eq!(table.values().unwrap(), vec![Some(10.0), Some(11.0), Some(12.0)]);
        assert_eq!(resolution.fill_value, Some(11.0));
        assert_eq!(resolution.rows_after, 3);
        assert_eq!(NullResolver::count_nulls(&table).get("value"), Some(0));
    }

    #[test]
    fn test_resolve_fill_mean_uses_prefill_values() {
        let mut table = corrected(&["1", "x", "2", "Null", "9"]);
        NullResolver::resolve(&mut table, NullPolicy::FillMean).unwrap();

        assert_eq!(
            table.values().unwrap(),
            vec![Some(1.0), Some(4.0), Some(2.0), Some(4.0), Some(9.0)]
        );
        assert_eq!(table.height(), 5);
    }

    #[test]
    fn test_resolve_fill_mode() {
        let mut table = corrected(&["5", "Null", "7", "7", "5"]);
        let resolution = NullResolver::resolve(&mut table, NullPolicy::FillMode).unwrap();
        assert_eq!(resolution.fill_value, Some(5.0));
        assert_eq!(table.values().unwrap()[1], Some(5.0));
    }

    #[test]
    fn test_resolve_drop_rows() {
        let mut table = corrected(&["10", "Null", "12", "bad"]);
        let resolution = NullResolver::resolve(&mut table, NullPolicy::DropRows).unwrap();

        assert_eq!(resolution.rows_before, 4);
        assert_eq!(resolution.rows_after, 2);
        assert_eq!(table.values().unwrap(), vec![Some(10.0), Some(12.0)]);
        assert_eq!(NullResolver::count_nulls(&table).get("value"), Some(0));
    }

    #[test]
    fn test_resolve_drop_rows_without_nulls_is_noop() {
        let mut table = corrected(&["1", "2"]);
        let before = table.data().clone();
        NullResolver::resolve(&mut table, NullPolicy::DropRows).unwrap();
        assert!(table.data().equals_missing(&before));
    }

    #[test]
    fn test_resolve_requires_corrected_table() {
        let df = df![
            "date" => ["2024-01-01"],
            "value" => ["Null"]
        ]
        .unwrap();
        let mut table = ColumnSelector::select(&df, "date", "value").unwrap();
        assert!(matches!(
            NullResolver::resolve(&mut table, NullPolicy::DropRows).unwrap_err(),
            PipelineError::NotReady(_)
        ));
    }
}
