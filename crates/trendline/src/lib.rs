//! Time Series Analysis Pipeline Library
//!
//! Loads a two-column time series (timestamp, value), repairs its formats,
//! characterizes it statistically and forecasts it, built with Rust, Polars
//! and augurs.
//!
//! # Overview
//!
//! - **Loading**: every field is read as raw text; no inference at load time
//! - **Column Selection**: narrows the table to a timestamp and a value column
//! - **Format Correction**: best-effort date parsing (fail-fast) and numeric
//!   coercion with quote stripping and a `Null` sentinel (soft-fail per value)
//! - **Null Resolution**: drop rows, or fill with mean, median or mode
//! - **Statistics**: summary, dispersion and shape, IQR outliers, moving
//!   averages, monthly groupings
//! - **Forecasting**: MSTL / ETS through a pluggable [`ForecastEngine`]
//! - **Reporting**: a JSON statistical aggregate for downstream narrative tools
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use trendline::{NullPolicy, TimeSeriesPipeline};
//!
//! let mut pipeline = TimeSeriesPipeline::builder().build()?;
//!
//! let preview = pipeline.load("data/sales.csv")?;
//! println!("{}", preview);
//!
//! pipeline.select("Date", "Sales")?;
//! if pipeline.inspect()?.needs_correction() {
//!     pipeline.correct()?;
//! }
//!
//! println!("{:?}", pipeline.count_nulls()?);
//! pipeline.resolve(NullPolicy::FillMedian)?;
//!
//! let stats = pipeline.summary()?;
//! let outliers = pipeline.outliers()?;
//! println!("mean {:.2}, {} outliers", stats.mean, outliers.len());
//!
//! pipeline.set_horizon(30)?;
//! pipeline.fit()?;
//! for row in pipeline.forecast()?.tail(5) {
//!     println!("{} {:.2} [{:.2}, {:.2}]", row.timestamp, row.point_estimate,
//!         row.lower_bound, row.upper_bound);
//! }
//! ```
//!
//! # Configuration
//!
//! ```rust,ignore
//! use trendline::PipelineConfig;
//!
//! let config = PipelineConfig::builder()
//!     .null_token("NA")
//!     .confidence_level(0.95)
//!     .seasonal_period(12)
//!     .moving_average_windows(vec![7, 30])
//!     .build()?;
//! ```
//!
//! # Custom Forecasting Engines
//!
//! Implement [`ForecastEngine`] and pass it to
//! [`TimeSeriesPipelineBuilder::engine`] to replace the default
//! [`AugursEngine`].

pub mod cleaner;
pub mod config;
pub mod error;
pub mod forecast;
pub mod imputers;
pub mod loader;
pub mod pipeline;
pub mod profiler;
pub mod reporting;
pub mod table;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{FormatCorrector, FormatInspector};
pub use config::{ConfigValidationError, NullPolicy, PipelineConfig, PipelineConfigBuilder};
pub use error::{PipelineError, Result, ResultExt};
pub use forecast::{
    AugursEngine, CanonicalSeries, ForecastAdapter, ForecastEngine, ForecastResult, ForecastRow,
    Spacing,
};
pub use imputers::{NullResolver, Resolution, StatisticalImputer};
pub use loader::TableLoader;
pub use pipeline::{
    ClosureProgressReporter, OutlierHandler, PipelineStage, ProgressReporter, ProgressUpdate,
    TimeSeriesPipeline, TimeSeriesPipelineBuilder,
};
pub use profiler::StatisticsEngine;
pub use reporting::{AnalysisReport, MonthlyStats, ReportGenerator};
pub use table::{ColumnSelector, WorkingTable};
pub use types::{
    ColumnNullCount, ColumnRole, CorrectionSummary, DataInfo, ExtendedStats, FormatDescriptor,
    FormatReport, MonthlyGroup, MovingAverage, NullCounts, OutlierRow, OutlierSet, StatsSummary,
};
