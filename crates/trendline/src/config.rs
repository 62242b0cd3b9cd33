//! Configuration types for the time series pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Strategy for resolving missing values in the value column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NullPolicy {
    /// Remove every row whose value is missing
    DropRows,
    /// Replace missing values with the mean of the present values
    FillMean,
    /// Replace missing values with the median of the present values
    FillMedian,
    /// Replace missing values with the most frequent present value
    FillMode,
}

impl NullPolicy {
    /// All policies, in interactive menu order (1-4).
    pub const ALL: [NullPolicy; 4] = [
        NullPolicy::DropRows,
        NullPolicy::FillMean,
        NullPolicy::FillMedian,
        NullPolicy::FillMode,
    ];

    /// Short description for menus and logs.
    pub fn description(&self) -> &'static str {
        match self {
            NullPolicy::DropRows => "Drop rows with null values",
            NullPolicy::FillMean => "Fill with mean",
            NullPolicy::FillMedian => "Fill with median",
            NullPolicy::FillMode => "Fill with mode",
        }
    }
}

impl fmt::Display for NullPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NullPolicy::DropRows => "drop",
            NullPolicy::FillMean => "mean",
            NullPolicy::FillMedian => "median",
            NullPolicy::FillMode => "mode",
        };
        write!(f, "{}", name)
    }
}

/// Accepts `drop`, `mean`, `median`, `mode` (case-insensitive) and the menu
/// numbers `1`-`4`.
impl FromStr for NullPolicy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" | "drop_rows" | "1" => Ok(NullPolicy::DropRows),
            "mean" | "fill_mean" | "2" => Ok(NullPolicy::FillMean),
            "median" | "fill_median" | "3" => Ok(NullPolicy::FillMedian),
            "mode" | "fill_mode" | "4" => Ok(NullPolicy::FillMode),
            _ => Err(PipelineError::InvalidPolicy(s.trim().to_string())),
        }
    }
}

/// Configuration for the time series pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use trendline::config::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .delimiter(b';')
///     .confidence_level(0.95)
///     .seasonal_period(12)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of rows returned as a preview after loading.
    /// Default: 5
    pub preview_rows: usize,

    /// Field delimiter of the input file.
    /// Default: b','
    pub delimiter: u8,

    /// Literal token (case-sensitive) that marks a missing value.
    /// Default: "Null"
    pub null_token: String,

    /// Quote characters stripped from both ends of raw values.
    /// Default: ['"', '\'']
    pub quote_chars: Vec<char>,

    /// Coverage of the forecast uncertainty interval (0.0 - 1.0, exclusive).
    /// Default: 0.8
    pub confidence_level: f64,

    /// Seasonal period in observations. If None, it is inferred from the
    /// spacing of the timestamps.
    /// Default: None
    pub seasonal_period: Option<usize>,

    /// Window sizes for the trailing moving averages.
    /// Default: [10, 50]
    pub moving_average_windows: Vec<usize>,

    /// Output directory for the report and forecast files.
    /// Default: "outputs"
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            preview_rows: 5,
            delimiter: b',',
            null_token: "Null".to_string(),
            quote_chars: vec!['"', '\''],
            confidence_level: 0.8,
            seasonal_period: None,
            moving_average_windows: vec![10, 50],
            output_dir: PathBuf::from("outputs"),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.preview_rows == 0 {
            return Err(ConfigValidationError::InvalidPreviewRows(self.preview_rows));
        }

        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(ConfigValidationError::InvalidConfidenceLevel(
                self.confidence_level,
            ));
        }

        if let Some(period) = self.seasonal_period
            && period < 2
        {
            return Err(ConfigValidationError::InvalidSeasonalPeriod(period));
        }

        if let Some(&window) = self.moving_average_windows.iter().find(|&&w| w == 0) {
            return Err(ConfigValidationError::InvalidWindow(window));
        }

        if self.null_token.is_empty() {
            return Err(ConfigValidationError::EmptyNullToken);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid preview rows: {0} (must be at least 1)")]
    InvalidPreviewRows(usize),

    #[error("Invalid confidence level: {0} (must be between 0.0 and 1.0, exclusive)")]
    InvalidConfidenceLevel(f64),

    #[error("Invalid seasonal period: {0} (must be at least 2)")]
    InvalidSeasonalPeriod(usize),

    #[error("Invalid moving average window: {0} (must be at least 1)")]
    InvalidWindow(usize),

    #[error("Null token must not be empty")]
    EmptyNullToken,
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    preview_rows: Option<usize>,
    delimiter: Option<u8>,
    null_token: Option<String>,
    quote_chars: Option<Vec<char>>,
    confidence_level: Option<f64>,
    seasonal_period: Option<usize>,
    moving_average_windows: Option<Vec<usize>>,
    output_dir: Option<PathBuf>,
}

impl PipelineConfigBuilder {
    /// Set the number of preview rows returned by `load`.
    pub fn preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = Some(rows);
        self
    }

    /// Set the field delimiter of the input file.
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Set the literal token treated as a missing value.
    pub fn null_token(mut self, token: impl Into<String>) -> Self {
        self.null_token = Some(token.into());
        self
    }

    /// Set the quote characters stripped from raw values.
    pub fn quote_chars(mut self, chars: Vec<char>) -> Self {
        self.quote_chars = Some(chars);
        self
    }

    /// Set the forecast interval coverage.
    ///
    /// # Arguments
    /// * `level` - Value between 0.0 and 1.0, exclusive (e.g., 0.8 = 80%)
    pub fn confidence_level(mut self, level: f64) -> Self {
        self.confidence_level = Some(level);
        self
    }

    /// Override the inferred seasonal period.
    pub fn seasonal_period(mut self, period: usize) -> Self {
        self.seasonal_period = Some(period);
        self
    }

    /// Set the moving average window sizes.
    pub fn moving_average_windows(mut self, windows: Vec<usize>) -> Self {
        self.moving_average_windows = Some(windows);
        self
    }

    /// Set the output directory for reports and forecasts.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let defaults = PipelineConfig::default();
        let config = PipelineConfig {
            preview_rows: self.preview_rows.unwrap_or(defaults.preview_rows),
            delimiter: self.delimiter.unwrap_or(defaults.delimiter),
            null_token: self.null_token.unwrap_or(defaults.null_token),
            quote_chars: self.quote_chars.unwrap_or(defaults.quote_chars),
            confidence_level: self.confidence_level.unwrap_or(defaults.confidence_level),
            seasonal_period: self.seasonal_period,
            moving_average_windows: self
                .moving_average_windows
                .unwrap_or(defaults.moving_average_windows),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
        };

        config.validate()?;
        Ok(config)
    }
}
