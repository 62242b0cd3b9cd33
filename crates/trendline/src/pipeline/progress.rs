//! Progress reporting for the time series pipeline.
//!
//! Each stage emits a [`ProgressUpdate`] to an optional [`ProgressReporter`].
//! Stages run to completion or fail outright; there is no cancellation.
//!
//! # Example
//!
//! ```rust,ignore
//! use trendline::TimeSeriesPipeline;
//!
//! let pipeline = TimeSeriesPipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of the time series pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Reading the input file
    Loading,
    /// Narrowing to the timestamp and value columns
    ColumnSelection,
    /// Classifying column formats
    FormatInspection,
    /// Coercing columns to date and number
    FormatCorrection,
    /// Counting and resolving missing values
    NullResolution,
    /// Computing statistics and outliers
    Statistics,
    /// Fitting the model and predicting
    Forecasting,
    /// Building and writing reports
    ReportGeneration,
    /// Pipeline stage failed with an error
    Failed,
}

impl PipelineStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loading => "Loading Data",
            Self::ColumnSelection => "Selecting Columns",
            Self::FormatInspection => "Inspecting Formats",
            Self::FormatCorrection => "Correcting Formats",
            Self::NullResolution => "Resolving Nulls",
            Self::Statistics => "Computing Statistics",
            Self::Forecasting => "Forecasting",
            Self::ReportGeneration => "Generating Reports",
            Self::Failed => "Failed",
        }
    }

    /// Returns the cumulative progress once this stage has finished.
    pub fn completed_progress(&self) -> f32 {
        match self {
            Self::Loading => 0.10,
            Self::ColumnSelection => 0.15,
            Self::FormatInspection => 0.20,
            Self::FormatCorrection => 0.35,
            Self::NullResolution => 0.45,
            Self::Statistics => 0.60,
            Self::Forecasting => 0.90,
            Self::ReportGeneration => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// A single progress update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Stage that produced the update
    pub stage: PipelineStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Human-readable message describing the outcome
    pub message: String,
}

impl ProgressUpdate {
    /// Creates an update for a finished stage.
    pub fn new(stage: PipelineStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            progress: stage.completed_progress(),
            message: message.into(),
        }
    }

    /// Creates a failed progress update.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: PipelineStage::Failed,
            progress: 0.0,
            message: message.into(),
        }
    }
}

/// Trait for receiving progress updates from the pipeline.
///
/// Implementations must be `Send + Sync` so a reporter can forward updates to
/// another thread (e.g. a UI event loop).
pub trait ProgressReporter: Send + Sync {
    /// Called once per finished or failed stage.
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    /// Creates a new closure-based progress reporter.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_progress_is_monotonic() {
        let stages = [
            PipelineStage::Loading,
            PipelineStage::ColumnSelection,
            PipelineStage::FormatInspection,
            PipelineStage::FormatCorrection,
            PipelineStage::NullResolution,
            PipelineStage::Statistics,
            PipelineStage::Forecasting,
            PipelineStage::ReportGeneration,
        ];
        for pair in stages.windows(2) {
            assert!(pair[0].completed_progress() < pair[1].completed_progress());
        }
        assert_eq!(PipelineStage::ReportGeneration.completed_progress(), 1.0);
    }

    #[test]
    fn test_closure_reporter() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let reporter = ClosureProgressReporter::new(move |update: ProgressUpdate| {
            sink.lock().unwrap().push(update.stage);
        });

        reporter.report(ProgressUpdate::new(PipelineStage::Loading, "loaded"));
        reporter.report(ProgressUpdate::failed("boom"));

        assert_eq!(
            *received.lock().unwrap(),
            vec![PipelineStage::Loading, PipelineStage::Failed]
        );
    }

    #[test]
    fn test_stage_serialization() {
        let json = serde_json::to_string(&PipelineStage::FormatCorrection).unwrap();
        assert_eq!(json, "\"format_correction\"");
    }
}
