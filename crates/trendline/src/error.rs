//! Custom error types for the time series pipeline.
//!
//! This module provides a single error hierarchy using `thiserror`. Every
//! stage reports failures at its boundary so the caller can fix the input and
//! re-invoke the failing stage, or abort the run.
//!
//! Errors are serializable so they can be emitted as part of a JSON report.

use crate::config::ConfigValidationError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Source file missing, unreadable, or not a well-formed table.
    #[error("Failed to load '{path}': {reason}")]
    Load { path: String, reason: String },

    /// Column was not found in the loaded table.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// The same column was selected for both roles.
    #[error("Invalid column selection: {0}")]
    InvalidSelection(String),

    /// Timestamp unparsable, or value column entirely unusable after coercion.
    #[error("It is not possible to proceed with the current data format: {0}")]
    FormatCorrection(String),

    /// Unrecognized null-handling choice.
    #[error("Invalid null handling policy '{0}' (expected drop, mean, median or mode)")]
    InvalidPolicy(String),

    /// Non-positive forecast horizon.
    #[error("Invalid forecast horizon {0}: number of periods must be positive")]
    InvalidHorizon(i64),

    /// A stage was invoked before the stages it depends on.
    #[error("Not ready: {0}")]
    NotReady(String),

    /// No table has been loaded (or it was already narrowed by selection).
    #[error("No data loaded")]
    NoDataLoaded,

    /// No valid values found in a column for computation.
    #[error("No valid values found in column '{0}'")]
    NoValidValues(String),

    /// The forecasting collaborator failed to fit or predict.
    #[error("Forecast engine error: {0}")]
    ForecastEngine(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigValidationError),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PipelineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code for machine-readable output.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Load { .. } => "LOAD_ERROR",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidSelection(_) => "INVALID_SELECTION",
            Self::FormatCorrection(_) => "FORMAT_CORRECTION_ERROR",
            Self::InvalidPolicy(_) => "INVALID_POLICY",
            Self::InvalidHorizon(_) => "INVALID_HORIZON",
            Self::NotReady(_) => "NOT_READY",
            Self::NoDataLoaded => "NO_DATA_LOADED",
            Self::NoValidValues(_) => "NO_VALID_VALUES",
            Self::ForecastEngine(_) => "FORECAST_ENGINE_ERROR",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if the caller can fix its input and re-invoke the failing stage
    /// against the same pipeline state.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::ColumnNotFound(_)
            | Self::InvalidSelection(_)
            | Self::InvalidPolicy(_)
            | Self::InvalidHorizon(_)
            | Self::NotReady(_)
            | Self::NoDataLoaded
            | Self::InvalidConfig(_) => true,
            Self::WithContext { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for PipelineError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PipelineError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PipelineError::Polars(e).with_context(context))
    }
}

static_assertions::assert_impl_all!(PipelineError: Send, Sync);
