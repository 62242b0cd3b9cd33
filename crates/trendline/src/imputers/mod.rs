//! Imputation module for handling missing values.
//!
//! This module provides:
//! - Per-column null counts
//! - Row dropping and statistical imputation (mean, median, mode)

mod null_resolver;
mod statistical;

pub use null_resolver::{NullResolver, Resolution};
pub use statistical::StatisticalImputer;
