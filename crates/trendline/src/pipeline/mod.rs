//! Pipeline module.
//!
//! This module provides the stage orchestrator and related components.

mod builder;
pub mod outliers;
pub mod progress;

pub use builder::{TimeSeriesPipeline, TimeSeriesPipelineBuilder};
pub use outliers::OutlierHandler;
pub use progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
