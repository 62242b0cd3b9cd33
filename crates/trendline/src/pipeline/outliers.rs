//! Outlier handling module.
//!
//! Removes the rows flagged by the IQR rule from the working table.

use crate::error::Result;
use crate::profiler::StatisticsEngine;
use crate::table::WorkingTable;
use tracing::{debug, info};

/// Handles outlier treatment on the working table.
pub struct OutlierHandler;

impl OutlierHandler {
    /// Remove rows whose value lies outside the IQR fences.
    ///
    /// Rows with a missing value are kept. Returns the number of rows removed.
    pub fn remove_outliers(
        table: &mut WorkingTable,
        processing_steps: &mut Vec<String>,
    ) -> Result<usize> {
        let outliers = StatisticsEngine::outliers(table)?;
        if outliers.is_empty() {
            debug!("No outliers outside [{}, {}]", outliers.lower_bound, outliers.upper_bound);
            processing_steps.push("No outliers found".to_string());
            return Ok(0);
        }

        let original_rows = table.height();
        let keep = outliers.keep_mask(original_rows);
        table.retain_rows(&keep)?;
        let removed = original_rows - table.height();

        info!(
            "Removed {} outlier rows outside [{:.2}, {:.2}]",
            removed, outliers.lower_bound, outliers.upper_bound
        );
        processing_steps.push(format!(
            "Removed {} outlier rows from '{}' using IQR bounds [{:.2}, {:.2}]",
            removed,
            table.value_name(),
            outliers.lower_bound,
            outliers.upper_bound
        ));
        Ok(removed)
    }
}
