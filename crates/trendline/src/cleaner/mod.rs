//! Format inspection and correction.
//!
//! This module provides functionality for:
//! - Classifying the working columns as text, numeric or date
//! - Coercing the timestamp column to calendar dates
//! - Coercing the value column to numbers, with quote stripping and
//!   null-token handling

mod converters;
mod format_corrector;
mod inspector;
mod sanitizers;

pub use format_corrector::FormatCorrector;
pub use inspector::FormatInspector;
