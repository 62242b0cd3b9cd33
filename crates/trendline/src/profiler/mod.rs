//! Statistical characterization of the value column.
//!
//! This module provides functionality for:
//! - Summary statistics (max, min, mean, median, mode)
//! - Dispersion and shape (standard deviation, skewness, kurtosis)
//! - IQR outlier detection
//! - Moving averages and calendar-month groupings
//!
//! Every call recomputes from the current table; nothing is cached across
//! mutating stages.

pub(crate) mod statistics;

use crate::error::{PipelineError, Result};
use crate::table::WorkingTable;
use crate::types::{
    ExtendedStats, MonthlyGroup, MovingAverage, OutlierRow, OutlierSet, StatsSummary,
};
use chrono::Datelike;
use statistics::IqrFences;
use std::collections::BTreeMap;
use tracing::debug;

/// Computes statistics over the VALUE column of a working table.
pub struct StatisticsEngine;

impl StatisticsEngine {
    /// Max, min, mean, median and mode of the non-missing values.
    pub fn summary(table: &WorkingTable) -> Result<StatsSummary> {
        let values = Self::present_values(table)?;

        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let no_values = || PipelineError::NoValidValues(table.value_name().to_string());

        let summary = StatsSummary {
            max,
            min,
            mean: statistics::mean(&values).ok_or_else(no_values)?,
            median: statistics::median(&values).ok_or_else(no_values)?,
            mode: statistics::mode(&values).ok_or_else(no_values)?,
        };
        debug!("Summary over {} values: {:?}", values.len(), summary);
        Ok(summary)
    }

    /// Count, missing count, standard deviation, skewness and kurtosis.
    pub fn extended(table: &WorkingTable) -> Result<ExtendedStats> {
        let all = table.values()?;
        let values = Self::present_values(table)?;

        Ok(ExtendedStats {
            count: values.len(),
            null_count: all.len() - values.len(),
            std: statistics::sample_std(&values),
            skewness: statistics::skewness(&values),
            kurtosis: statistics::excess_kurtosis(&values),
        })
    }

    /// Rows whose value lies strictly outside `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]`,
    /// in table order.
    pub fn outliers(table: &WorkingTable) -> Result<OutlierSet> {
        let values = table.values()?;
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let fences = IqrFences::compute(&present)
            .ok_or_else(|| PipelineError::NoValidValues(table.value_name().to_string()))?;
        let timestamps = table.timestamps().ok();

        let rows: Vec<OutlierRow> = values
            .iter()
            .enumerate()
            .filter_map(|(row, value)| {
                let value = (*value)?;
                fences.is_outlier(value).then(|| OutlierRow {
                    row,
                    timestamp: timestamps.as_ref().and_then(|ts| ts[row]),
                    value,
                })
            })
            .collect();

        debug!(
            "Outlier fences [{}, {}] flag {} of {} values",
            fences.lower,
            fences.upper,
            rows.len(),
            present.len()
        );

        Ok(OutlierSet {
            q1: fences.q1,
            q3: fences.q3,
            iqr: fences.iqr,
            lower_bound: fences.lower,
            upper_bound: fences.upper,
            rows,
        })
    }

    /// Trailing moving averages for each window, in row order.
    pub fn moving_averages(table: &WorkingTable, windows: &[usize]) -> Result<Vec<MovingAverage>> {
        let values = table.values()?;
        Ok(windows
            .iter()
            .map(|&window| MovingAverage {
                window,
                values: statistics::rolling_mean(&values, window),
            })
            .collect())
    }

    /// Non-missing values grouped by calendar month, months ascending.
    pub fn monthly_groups(table: &WorkingTable) -> Result<Vec<MonthlyGroup>> {
        let timestamps = table.timestamps()?;
        let values = table.values()?;

        let mut groups: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for (ts, value) in timestamps.iter().zip(values.iter()) {
            if let (Some(ts), Some(value)) = (ts, value) {
                groups.entry(ts.month()).or_default().push(*value);
            }
        }

        Ok(groups
            .into_iter()
            .map(|(month, values)| MonthlyGroup { month, values })
            .collect())
    }

    /// Non-missing values; fails when there are none.
    fn present_values(table: &WorkingTable) -> Result<Vec<f64>> {
        let values: Vec<f64> = table.values()?.into_iter().flatten().collect();
        if values.is_empty() {
            return Err(PipelineError::NoValidValues(table.value_name().to_string()));
        }
        Ok(values)
    }
}
