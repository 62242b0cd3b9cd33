use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic role of a working table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnRole {
    Timestamp,
    Value,
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRole::Timestamp => write!(f, "timestamp"),
            ColumnRole::Value => write!(f, "value"),
        }
    }
}

/// Semantic type tag of a column, derived from its current contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatDescriptor {
    Text,
    Numeric,
    Date,
}

impl fmt::Display for FormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatDescriptor::Text => write!(f, "text"),
            FormatDescriptor::Numeric => write!(f, "numeric"),
            FormatDescriptor::Date => write!(f, "date"),
        }
    }
}

/// Result of inspecting both working columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatReport {
    pub timestamp: FormatDescriptor,
    pub value: FormatDescriptor,
    /// Stored dtype of the timestamp column (e.g. "str", "date").
    pub timestamp_dtype: String,
    /// Stored dtype of the value column (e.g. "str", "f64").
    pub value_dtype: String,
    pub timestamp_stored_as_date: bool,
    pub value_stored_as_float: bool,
}

impl FormatReport {
    /// True when both columns are stored in their canonical types and the
    /// downstream stages can run without `correct()`.
    pub fn is_ready(&self) -> bool {
        self.timestamp_stored_as_date && self.value_stored_as_float
    }

    pub fn needs_correction(&self) -> bool {
        !self.is_ready()
    }
}

/// Outcome of a format correction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionSummary {
    /// Rows in the corrected table.
    pub rows: usize,
    /// Values that were present but could not be parsed as numbers.
    pub coerced_to_missing: usize,
    /// Values that matched the null token.
    pub null_tokens: usize,
    /// Values that were already missing before correction.
    pub already_missing: usize,
    /// True when both columns were already typed and only cast.
    pub already_typed: bool,
}

impl CorrectionSummary {
    /// Total missing values in the value column after correction.
    pub fn missing_values(&self) -> usize {
        self.coerced_to_missing + self.null_tokens + self.already_missing
    }
}

/// Null count of a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnNullCount {
    pub column: String,
    pub count: usize,
}

/// Per-column null counts, in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullCounts {
    pub columns: Vec<ColumnNullCount>,
}

impl NullCounts {
    /// Null count of the named column, if it exists.
    pub fn get(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .find(|c| c.column == column)
            .map(|c| c.count)
    }

    pub fn total(&self) -> usize {
        self.columns.iter().map(|c| c.count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.columns.iter().map(|c| (c.column.as_str(), c.count))
    }
}

/// Shape and null counts of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataInfo {
    pub rows: usize,
    pub columns: usize,
    pub column_names: Vec<String>,
    pub null_counts: NullCounts,
}

/// Snapshot of the central statistics of the value column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub max: f64,
    pub min: f64,
    pub mean: f64,
    pub median: f64,
    pub mode: f64,
}

/// Dispersion and shape statistics of the value column.
///
/// Undefined values (too few points for the estimator) are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtendedStats {
    /// Non-missing values.
    pub count: usize,
    /// Missing values.
    pub null_count: usize,
    /// Sample standard deviation (n - 1 denominator).
    pub std: Option<f64>,
    /// Bias-corrected sample skewness.
    pub skewness: Option<f64>,
    /// Bias-corrected excess kurtosis.
    pub kurtosis: Option<f64>,
}

/// A single row flagged as an outlier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierRow {
    /// Position of the row in the working table.
    pub row: usize,
    pub timestamp: Option<NaiveDate>,
    pub value: f64,
}

/// Rows whose value lies strictly outside the IQR fences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierSet {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub rows: Vec<OutlierRow>,
}

impl OutlierSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Outlier values in table order.
    pub fn values(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.value).collect()
    }

    /// Whether the given row position is flagged. Rows are kept in table
    /// order.
    pub fn contains_row(&self, row: usize) -> bool {
        self.rows.binary_search_by_key(&row, |r| r.row).is_ok()
    }

    /// One entry per table row, `false` for flagged rows.
    pub fn keep_mask(&self, height: usize) -> Vec<bool> {
        let mut keep = vec![true; height];
        for r in &self.rows {
            if let Some(slot) = keep.get_mut(r.row) {
                *slot = false;
            }
        }
        keep
    }
}

/// Trailing rolling mean of the value column for one window size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingAverage {
    pub window: usize,
    /// One entry per table row; `None` until the window is full or when the
    /// window contains a missing value.
    pub values: Vec<Option<f64>>,
}

/// Values observed in one calendar month (1-12), across all years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyGroup {
    pub month: u32,
    pub values: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_report_readiness() {
        let mut report = FormatReport {
            timestamp: FormatDescriptor::Date,
            value: FormatDescriptor::Numeric,
            timestamp_dtype: "str".to_string(),
            value_dtype: "str".to_string(),
            timestamp_stored_as_date: false,
            value_stored_as_float: false,
        };
        assert!(report.needs_correction());

        report.timestamp_stored_as_date = true;
        report.value_stored_as_float = true;
        assert!(report.is_ready());
    }

    #[test]
    fn test_null_counts_lookup() {
        let counts = NullCounts {
            columns: vec![
                ColumnNullCount {
                    column: "date".to_string(),
                    count: 0,
                },
                ColumnNullCount {
                    column: "sales".to_string(),
                    count: 3,
                },
            ],
        };
        assert_eq!(counts.get("sales"), Some(3));
        assert_eq!(counts.get("missing"), None);
        assert_eq!(counts.total(), 3);
        assert_eq!(
            counts.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            vec!["date", "sales"]
        );
    }

    #[test]
    fn test_correction_summary_missing_values() {
        let summary = CorrectionSummary {
            rows: 10,
            coerced_to_missing: 2,
            null_tokens: 1,
            already_missing: 1,
            already_typed: false,
        };
        assert_eq!(summary.missing_values(), 4);
    }

    #[test]
    fn test_display() {
        assert_eq!(ColumnRole::Timestamp.to_string(), "timestamp");
        assert_eq!(FormatDescriptor::Numeric.to_string(), "numeric");
    }
}
