use crate::error::{PipelineError, Result};
use crate::forecast::ForecastResult;
use crate::profiler::StatisticsEngine;
use crate::table::WorkingTable;
use crate::types::StatsSummary;
use crate::utils::{format_date, round2};
use chrono::{Datelike, Local};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ============================================================================
// Report Types
// ============================================================================

/// Statistical aggregate of the working table handed to narrative tooling.
///
/// Use this for both JSON output (`--json`) and file writing (`--emit-report`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    /// Path to the input file
    pub input_file: String,
    pub timestamp_column: String,
    pub value_column: String,

    /// Rows in the working table
    pub total_observations: usize,
    /// `YYYY-MM-DD to YYYY-MM-DD`
    pub date_range: String,

    pub summary: StatsSummary,
    pub null_count: usize,
    pub std: Option<f64>,
    pub skewness: Option<f64>,
    pub kurtosis: Option<f64>,

    pub outlier_count: usize,
    /// Outliers as a percentage of all rows
    pub outlier_percentage: f64,

    /// Per calendar month (1-12), across all years
    pub monthly_stats: BTreeMap<u32, MonthlyStats>,
    pub yearly_means: BTreeMap<i32, f64>,
    pub monthly_means: BTreeMap<u32, f64>,
}

/// Mean, standard deviation and count of one calendar month, rounded to two
/// decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyStats {
    pub mean: f64,
    /// `None` for months with a single observation
    pub std: Option<f64>,
    pub count: usize,
}

// ============================================================================
// Generator
// ============================================================================

const MONTH: &str = "month";
const YEAR: &str = "year";
const VALUE: &str = "value";
const MEAN: &str = "mean";
const STD: &str = "std";
const COUNT: &str = "count";

/// Builds the analysis aggregate and writes JSON artifacts.
pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl ReportGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Aggregate the current working table.
    ///
    /// The table must have been corrected and have at least one value.
    pub fn build_report(input_file: &str, table: &WorkingTable) -> Result<AnalysisReport> {
        let summary = StatisticsEngine::summary(table)?;
        let extended = StatisticsEngine::extended(table)?;
        let outliers = StatisticsEngine::outliers(table)?;

        let timestamps = table.timestamps()?;
        let values = table.values()?;

        let first = timestamps.iter().flatten().min();
        let last = timestamps.iter().flatten().max();
        let date_range = match (first, last) {
            (Some(first), Some(last)) => format!("{} to {}", format_date(*first), format_date(*last)),
            _ => {
                return Err(PipelineError::NotReady(
                    "timestamp column has no dates".to_string(),
                ));
            }
        };

        let mut months: Vec<u32> = Vec::with_capacity(values.len());
        let mut years: Vec<i32> = Vec::with_capacity(values.len());
        let mut present: Vec<f64> = Vec::with_capacity(values.len());
        for (ts, value) in timestamps.iter().zip(values.iter()) {
            if let (Some(ts), Some(value)) = (ts, value) {
                months.push(ts.month());
                years.push(ts.year());
                present.push(*value);
            }
        }
        let calendar = df![
            MONTH => months,
            YEAR => years,
            VALUE => present
        ]?;

        let by_month = Self::grouped(&calendar, MONTH)?;
        let month_keys = by_month.column(MONTH)?.as_materialized_series().u32()?;
        let month_means = by_month.column(MEAN)?.as_materialized_series().f64()?;
        let month_stds = by_month.column(STD)?.as_materialized_series().f64()?;
        let month_counts = by_month
            .column(COUNT)?
            .as_materialized_series()
            .cast(&DataType::UInt64)?;

        let mut monthly_stats: BTreeMap<u32, MonthlyStats> = BTreeMap::new();
        for (((month, mean), std), count) in month_keys
            .into_iter()
            .zip(month_means.into_iter())
            .zip(month_stds.into_iter())
            .zip(month_counts.u64()?.into_iter())
        {
            if let (Some(month), Some(mean), Some(count)) = (month, mean, count) {
                monthly_stats.insert(
                    month,
                    MonthlyStats {
                        mean: round2(mean),
                        std: std.filter(|_| count > 1).map(round2),
                        count: count as usize,
                    },
                );
            }
        }
        let monthly_means = monthly_stats.iter().map(|(&m, s)| (m, s.mean)).collect();

        let by_year = Self::grouped(&calendar, YEAR)?;
        let yearly_means: BTreeMap<i32, f64> = by_year
            .column(YEAR)?
            .as_materialized_series()
            .i32()?
            .into_iter()
            .zip(by_year.column(MEAN)?.as_materialized_series().f64()?.into_iter())
            .filter_map(|(year, mean)| Some((year?, round2(mean?))))
            .collect();

        let total = table.height();
        let outlier_percentage = if total == 0 {
            0.0
        } else {
            outliers.len() as f64 / total as f64 * 100.0
        };

        debug!(
            "Built report over {} rows, {} months, {} outliers",
            total,
            monthly_stats.len(),
            outliers.len()
        );

        Ok(AnalysisReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_file: input_file.to_string(),
            timestamp_column: table.timestamp_name().to_string(),
            value_column: table.value_name().to_string(),
            total_observations: total,
            date_range,
            summary,
            null_count: extended.null_count,
            std: extended.std,
            skewness: extended.skewness,
            kurtosis: extended.kurtosis,
            outlier_count: outliers.len(),
            outlier_percentage,
            monthly_stats,
            yearly_means,
            monthly_means,
        })
    }

    /// Mean, sample standard deviation and count of `VALUE` per `key`.
    fn grouped(calendar: &DataFrame, key: &str) -> PolarsResult<DataFrame> {
        calendar
            .clone()
            .lazy()
            .group_by([col(key)])
            .agg([
                col(VALUE).mean().alias(MEAN),
                col(VALUE).std(1).alias(STD),
                col(VALUE).count().alias(COUNT),
            ])
            .collect()
    }

    /// Write `<stem>_report.json` and return its path.
    pub fn write_report(&self, report: &AnalysisReport, stem: &str) -> Result<PathBuf> {
        self.write_json(report, &format!("{}_report.json", stem))
    }

    /// Write `<stem>_forecast.json` and return its path.
    pub fn write_forecast(&self, forecast: &ForecastResult, stem: &str) -> Result<PathBuf> {
        self.write_json(forecast, &format!("{}_forecast.json", stem))
    }

    fn write_json<T: Serialize>(&self, value: &T, file_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(file_name);
        let mut file = File::create(&path)?;
        file.write_all(serde_json::to_string_pretty(value)?.as_bytes())?;
        info!("Saved: {}", path.display());
        Ok(path)
    }
}
