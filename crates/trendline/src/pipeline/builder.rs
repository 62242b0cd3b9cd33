//! The time series pipeline and its builder.
//!
//! [`TimeSeriesPipeline`] owns the loaded table and the working table and
//! exposes every stage as a method. Stages run in order; calling one before
//! its prerequisites fails with [`PipelineError::NoDataLoaded`] or
//! [`PipelineError::NotReady`] and leaves the state untouched.

use crate::cleaner::{FormatCorrector, FormatInspector};
use crate::config::{NullPolicy, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::forecast::{AugursEngine, ForecastAdapter, ForecastEngine, ForecastResult};
use crate::imputers::{NullResolver, Resolution};
use crate::loader::TableLoader;
use crate::pipeline::OutlierHandler;
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::profiler::StatisticsEngine;
use crate::reporting::{AnalysisReport, ReportGenerator};
use crate::table::{ColumnSelector, WorkingTable};
use crate::types::{
    CorrectionSummary, DataInfo, ExtendedStats, FormatReport, MonthlyGroup, MovingAverage,
    NullCounts, OutlierSet, StatsSummary,
};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Sequential, stateful time series pipeline.
///
/// Use [`TimeSeriesPipeline::builder()`] to create a pipeline with custom
/// configuration.
///
/// # Example
///
/// ```rust,ignore
/// use trendline::{NullPolicy, TimeSeriesPipeline};
///
/// let mut pipeline = TimeSeriesPipeline::builder()
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?;
///
/// pipeline.load("data/sales.csv")?;
/// pipeline.select("Date", "Sales")?;
/// if pipeline.inspect()?.needs_correction() {
///     pipeline.correct()?;
/// }
/// pipeline.resolve(NullPolicy::FillMedian)?;
/// pipeline.set_horizon(30)?;
/// pipeline.fit()?;
/// let forecast = pipeline.forecast()?;
/// ```
pub struct TimeSeriesPipeline {
    config: PipelineConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    loader: TableLoader,
    corrector: FormatCorrector,
    adapter: ForecastAdapter,
    source_path: Option<PathBuf>,
    source: Option<DataFrame>,
    table: Option<WorkingTable>,
    processing_steps: Vec<String>,
}

impl TimeSeriesPipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> TimeSeriesPipelineBuilder {
        TimeSeriesPipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The loaded table, until a column selection replaces it.
    pub fn source(&self) -> Option<&DataFrame> {
        self.source.as_ref()
    }

    /// The two-column working table, once selected.
    pub fn table(&self) -> Option<&WorkingTable> {
        self.table.as_ref()
    }

    /// Descriptions of every mutation applied so far.
    pub fn processing_steps(&self) -> &[String] {
        &self.processing_steps
    }

    /// Name of the forecasting engine in use.
    pub fn engine_name(&self) -> &str {
        self.adapter.engine_name()
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    /// Emit the outcome of a stage and pass the result through.
    fn finish<T>(
        &self,
        stage: PipelineStage,
        result: Result<T>,
        message: impl FnOnce(&T) -> String,
    ) -> Result<T> {
        match &result {
            Ok(value) => self.report_progress(ProgressUpdate::new(stage, message(value))),
            Err(e) => {
                error!("{} failed: {}", stage.display_name(), e);
                self.report_progress(ProgressUpdate::failed(format!(
                    "{}: {}",
                    stage.display_name(),
                    e
                )));
            }
        }
        result
    }

    fn working(&self) -> Result<&WorkingTable> {
        self.table.as_ref().ok_or(PipelineError::NoDataLoaded)
    }

    fn working_mut(&mut self) -> Result<&mut WorkingTable> {
        self.table.as_mut().ok_or(PipelineError::NoDataLoaded)
    }

    // ------------------------------------------------------------------
    // Loading and selection
    // ------------------------------------------------------------------

    /// Load a delimited file and return its preview.
    ///
    /// Replaces any previously loaded or selected table.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let result = self.loader.load(path);
        let df = self.finish(PipelineStage::Loading, result, |df| {
            format!("Loaded {} rows x {} columns", df.height(), df.width())
        })?;

        let preview = self.loader.preview(&df);
        self.source_path = Some(path.to_path_buf());
        self.source = Some(df);
        self.table = None;
        self.processing_steps.clear();
        self.adapter.invalidate();
        Ok(preview)
    }

    /// Path of the loaded file.
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// First rows of the current table (working table if selected).
    pub fn preview(&self) -> Result<DataFrame> {
        match (&self.table, &self.source) {
            (Some(table), _) => Ok(self.loader.preview(table.data())),
            (None, Some(df)) => Ok(self.loader.preview(df)),
            (None, None) => Err(PipelineError::NoDataLoaded),
        }
    }

    /// Shape and null counts of the current table.
    pub fn data_info(&self) -> Result<DataInfo> {
        match (&self.table, &self.source) {
            (Some(table), _) => Ok(TableLoader::data_info(table.data())),
            (None, Some(df)) => Ok(TableLoader::data_info(df)),
            (None, None) => Err(PipelineError::NoDataLoaded),
        }
    }

    /// Narrow the loaded table to the timestamp and value columns.
    ///
    /// On success the other columns are discarded. On failure the loaded
    /// table is kept so the selection can be retried.
    pub fn select(&mut self, timestamp: &str, value: &str) -> Result<()> {
        let source = self.source.as_ref().ok_or(PipelineError::NoDataLoaded)?;
        let result = ColumnSelector::select(source, timestamp, value);
        let table = self.finish(PipelineStage::ColumnSelection, result, |t| {
            format!(
                "Selected '{}' as timestamp and '{}' as value",
                t.timestamp_name(),
                t.value_name()
            )
        })?;

        self.source = None;
        self.table = Some(table);
        self.processing_steps.push(format!(
            "Selected columns '{}' (timestamp) and '{}' (value)",
            timestamp, value
        ));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Formats
    // ------------------------------------------------------------------

    /// Classify the current format of both working columns.
    pub fn inspect(&self) -> Result<FormatReport> {
        let result = self.working().and_then(FormatInspector::inspect);
        self.finish(PipelineStage::FormatInspection, result, |r| {
            format!("Timestamp is {}, value is {}", r.timestamp, r.value)
        })
    }

    /// Coerce the timestamp column to dates and the value column to numbers.
    pub fn correct(&mut self) -> Result<CorrectionSummary> {
        let corrector = self.corrector.clone();
        let result = self
            .working_mut()
            .and_then(|table| corrector.correct(table));
        let summary = self.finish(PipelineStage::FormatCorrection, result, |s| {
            format!("Corrected {} rows, {} missing values", s.rows, s.missing_values())
        })?;

        self.adapter.invalidate();
        self.processing_steps.push(format!(
            "Corrected formats: {} values coerced to missing, {} null tokens",
            summary.coerced_to_missing, summary.null_tokens
        ));
        Ok(summary)
    }

    // ------------------------------------------------------------------
    // Missing values
    // ------------------------------------------------------------------

    /// Null count per working column.
    pub fn count_nulls(&self) -> Result<NullCounts> {
        Ok(NullResolver::count_nulls(self.working()?))
    }

    /// Apply one null-handling policy to the value column.
    pub fn resolve(&mut self, policy: NullPolicy) -> Result<Resolution> {
        let result = self
            .working_mut()
            .and_then(|table| NullResolver::resolve(table, policy));
        let resolution = self.finish(PipelineStage::NullResolution, result, |r| {
            format!(
                "Applied '{}': {} rows before, {} after",
                r.policy, r.rows_before, r.rows_after
            )
        })?;

        self.adapter.invalidate();
        self.processing_steps
            .extend(resolution.processing_steps.iter().cloned());
        Ok(resolution)
    }

    // ------------------------------------------------------------------
    // Statistics
    // ------------------------------------------------------------------

    pub fn summary(&self) -> Result<StatsSummary> {
        let result = self.working().and_then(StatisticsEngine::summary);
        self.finish(PipelineStage::Statistics, result, |s| {
            format!("Mean {:.2}, median {:.2}", s.mean, s.median)
        })
    }

    pub fn extended(&self) -> Result<ExtendedStats> {
        StatisticsEngine::extended(self.working()?)
    }

    pub fn outliers(&self) -> Result<OutlierSet> {
        let result = self.working().and_then(StatisticsEngine::outliers);
        self.finish(PipelineStage::Statistics, result, |o| {
            format!("{} outliers outside [{:.2}, {:.2}]", o.len(), o.lower_bound, o.upper_bound)
        })
    }

    /// Drop the rows flagged as outliers. Returns the number removed.
    pub fn remove_outliers(&mut self) -> Result<usize> {
        let mut steps = Vec::new();
        let result = self
            .working_mut()
            .and_then(|table| OutlierHandler::remove_outliers(table, &mut steps));
        let removed = self.finish(PipelineStage::Statistics, result, |n| {
            format!("Removed {} outlier rows", n)
        })?;

        if removed > 0 {
            self.adapter.invalidate();
        }
        self.processing_steps.extend(steps);
        Ok(removed)
    }

    /// Moving averages for the configured windows.
    pub fn moving_averages(&self) -> Result<Vec<MovingAverage>> {
        StatisticsEngine::moving_averages(self.working()?, &self.config.moving_average_windows)
    }

    pub fn monthly_groups(&self) -> Result<Vec<MonthlyGroup>> {
        StatisticsEngine::monthly_groups(self.working()?)
    }

    // ------------------------------------------------------------------
    // Forecasting
    // ------------------------------------------------------------------

    pub fn set_horizon(&mut self, periods: i64) -> Result<()> {
        self.adapter.set_horizon(periods)
    }

    pub fn horizon(&self) -> Option<usize> {
        self.adapter.horizon()
    }

    /// Fit the forecasting engine to the working table.
    pub fn fit(&mut self) -> Result<()> {
        let table = self.table.as_ref().ok_or(PipelineError::NoDataLoaded)?;
        let result = self.adapter.fit(table);
        let engine = self.adapter.engine_name().to_string();
        self.finish(PipelineStage::Forecasting, result, |_| {
            format!("Fitted {}", engine)
        })
    }

    /// Forecast the history plus the horizon.
    pub fn forecast(&self) -> Result<ForecastResult> {
        let result = self.adapter.forecast();
        self.finish(PipelineStage::Forecasting, result, |f| {
            format!("Forecast {} periods ahead", f.horizon)
        })
    }

    // ------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------

    /// Statistical aggregate of the working table.
    pub fn report(&self) -> Result<AnalysisReport> {
        let input = self
            .source_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let result = self
            .working()
            .and_then(|table| ReportGenerator::build_report(&input, table));
        self.finish(PipelineStage::ReportGeneration, result, |r| {
            format!("Report covers {}", r.date_range)
        })
    }

    /// Write the report, and the forecast if given, to the output directory.
    ///
    /// Files are named after the input file stem. Returns the written paths.
    pub fn write_outputs(
        &self,
        report: &AnalysisReport,
        forecast: Option<&ForecastResult>,
    ) -> Result<Vec<PathBuf>> {
        let generator = ReportGenerator::new(self.config.output_dir.clone());
        let stem = self
            .source_path
            .as_ref()
            .and_then(|p| p.file_stem())
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "trendline".to_string());

        let mut written = vec![generator.write_report(report, &stem)?];
        if let Some(forecast) = forecast {
            written.push(generator.write_forecast(forecast, &stem)?);
        }
        debug!("Wrote {} output files", written.len());
        Ok(written)
    }
}

/// Builder for creating a [`TimeSeriesPipeline`].
#[derive(Default)]
pub struct TimeSeriesPipelineBuilder {
    config: Option<PipelineConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    engine: Option<Box<dyn ForecastEngine>>,
}

impl TimeSeriesPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving stage updates.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Replace the default [`AugursEngine`].
    pub fn engine(mut self, engine: Box<dyn ForecastEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Build the pipeline.
    ///
    /// Fails with [`PipelineError::InvalidConfig`] if the configuration is
    /// invalid.
    pub fn build(self) -> Result<TimeSeriesPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let engine = self.engine.unwrap_or_else(|| {
            Box::new(AugursEngine::new(
                config.confidence_level,
                config.seasonal_period,
            ))
        });
        info!("Pipeline ready with forecasting engine '{}'", engine.name());

        Ok(TimeSeriesPipeline {
            loader: TableLoader::new(config.delimiter, config.preview_rows),
            corrector: FormatCorrector::from_config(&config),
            adapter: ForecastAdapter::new(engine),
            config,
            progress_reporter: self.progress_reporter,
            source_path: None,
            source: None,
            table: None,
            processing_steps: Vec::new(),
        })
    }
}
