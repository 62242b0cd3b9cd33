//! Report generation module.
//!
//! Builds the statistical aggregate of a working table and writes the report
//! and forecast JSON files to the output directory.
//!
//! # Example
//!
//! ```rust,ignore
//! use trendline::reporting::ReportGenerator;
//!
//! let report = ReportGenerator::build_report("data/sales.csv", &table)?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//!
//! let generator = ReportGenerator::new("outputs");
//! generator.write_report(&report, "sales")?;
//! ```

mod generator;

pub use generator::{AnalysisReport, MonthlyStats, ReportGenerator};
