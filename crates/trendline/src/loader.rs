//! Raw table loading.
//!
//! Every column is read as text so quoted numbers, locale-specific dates and
//! null tokens reach the correction stage untouched.

use crate::error::{PipelineError, Result};
use crate::types::{ColumnNullCount, DataInfo, NullCounts};
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Reads delimited files into an all-text `DataFrame`.
#[derive(Debug, Clone)]
pub struct TableLoader {
    delimiter: u8,
    preview_rows: usize,
}

impl Default for TableLoader {
    fn default() -> Self {
        Self::new(b',', 5)
    }
}

impl TableLoader {
    pub fn new(delimiter: u8, preview_rows: usize) -> Self {
        Self {
            delimiter,
            preview_rows,
        }
    }

    /// Load the file at `path` with every field stored as raw text.
    ///
    /// Fails with [`PipelineError::Load`] when the path does not exist, cannot
    /// be read, or is not a well-formed table.
    pub fn load(&self, path: &Path) -> Result<DataFrame> {
        let shown = path.display().to_string();
        let load_error = |reason: String| PipelineError::Load {
            path: shown.clone(),
            reason,
        };

        if !path.is_file() {
            return Err(load_error("file does not exist".to_string()));
        }

        debug!("Reading {} with delimiter {:?}", shown, self.delimiter as char);

        self.check_field_counts(path).map_err(&load_error)?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .with_parse_options(CsvParseOptions::default().with_separator(self.delimiter))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .map_err(|e| load_error(e.to_string()))?
            .finish()
            .map_err(|e| load_error(e.to_string()))?;

        if df.width() == 0 {
            return Err(load_error("table has no columns".to_string()));
        }

        info!(
            "Loaded {} rows x {} columns from {}",
            df.height(),
            df.width(),
            shown
        );
        Ok(df)
    }

    /// Every record must carry as many fields as the header.
    fn check_field_counts(&self, path: &Path) -> std::result::Result<(), String> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(false)
            .from_path(path)
            .map_err(|e| e.to_string())?;

        let expected = reader.byte_headers().map_err(|e| e.to_string())?.len();
        for (row, record) in reader.byte_records().enumerate() {
            record.map_err(|e| match e.kind() {
                csv::ErrorKind::UnequalLengths { len, .. } => {
                    format!("row {} has {} fields, header has {}", row, len, expected)
                }
                _ => e.to_string(),
            })?;
        }
        Ok(())
    }

    /// First rows of the table for display. The table itself is not truncated.
    pub fn preview(&self, df: &DataFrame) -> DataFrame {
        df.head(Some(self.preview_rows))
    }

    /// Shape and per-column null counts.
    pub fn data_info(df: &DataFrame) -> DataInfo {
        DataInfo {
            rows: df.height(),
            columns: df.width(),
            column_names: df
                .get_column_names()
                .into_iter()
                .map(|name| name.to_string())
                .collect(),
            null_counts: null_counts(df),
        }
    }
}

/// Per-column null counts in column order.
pub(crate) fn null_counts(df: &DataFrame) -> NullCounts {
    NullCounts {
        columns: df
            .get_columns()
            .iter()
            .map(|col| ColumnNullCount {
                column: col.name().to_string(),
                count: col.null_count(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_csv(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("trendline_loader_tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_reads_everything_as_text() {
        let path = write_temp_csv(
            "text_only.csv",
            "date,sales,region\n2024-01-01,10,north\n2024-01-02,Null,south\n",
        );
        let loader = TableLoader::default();
        let df = loader.load(&path).unwrap();

        assert_eq!(df.shape(), (2, 3));
        for col in df.get_columns() {
            assert_eq!(col.dtype(), &DataType::String);
        }
        let sales = df.column("sales").unwrap().as_materialized_series();
        assert_eq!(sales.str().unwrap().get(1), Some("Null"));
    }

    #[test]
    fn test_load_missing_file() {
        let loader = TableLoader::default();
        let err = loader
            .load(Path::new("/definitely/not/here.csv"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Load { .. }));
        assert_eq!(err.error_code(), "LOAD_ERROR");
    }

    #[test]
    fn test_load_rejects_short_rows() {
        let path = write_temp_csv(
            "short_rows.csv",
            "date,value,extra\n2024-01-01,1,x\n2024-01-02,2\n2024-01-03\n",
        );
        let err = TableLoader::default().load(&path).unwrap_err();
        match err {
            PipelineError::Load { reason, .. } => {
                assert!(reason.contains("row 1 has 2 fields"), "{}", reason)
            }
            other => panic!("expected load error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_rejects_long_rows() {
        let path = write_temp_csv(
            "long_rows.csv",
            "date,value\n2024-01-01,1\n2024-01-02,2,3\n",
        );
        let err = TableLoader::default().load(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Load { .. }));
    }

    #[test]
    fn test_load_accepts_quoted_delimiters() {
        let path = write_temp_csv(
            "quoted.csv",
            "date,value\n\"Jan 4, 2024\",3\n2024-01-05,4\n",
        );
        let df = TableLoader::default().load(&path).unwrap();
        assert_eq!(df.shape(), (2, 2));
    }

    #[test]
    fn test_load_custom_delimiter() {
        let path = write_temp_csv("semicolon.csv", "date;value\n2024-01-01;1,5\n");
        let loader = TableLoader::new(b';', 5);
        let df = loader.load(&path).unwrap();

        assert_eq!(df.shape(), (1, 2));
        let value = df.column("value").unwrap().as_materialized_series();
        assert_eq!(value.str().unwrap().get(0), Some("1,5"));
    }

    #[test]
    fn test_preview_is_bounded() {
        let df = df![
            "date" => ["a", "b", "c", "d", "e", "f", "g"],
            "value" => ["1", "2", "3", "4", "5", "6", "7"]
        ]
        .unwrap();
        let loader = TableLoader::new(b',', 5);

        let preview = loader.preview(&df);
        assert_eq!(preview.height(), 5);
        assert_eq!(df.height(), 7);
    }

    #[test]
    fn test_data_info() {
        let df = df![
            "date" => [Some("2024-01-01"), Some("2024-01-02"), None],
            "value" => [Some("1"), None, None]
        ]
        .unwrap();

        let info = TableLoader::data_info(&df);
        assert_eq!(info.rows, 3);
        assert_eq!(info.columns, 2);
        assert_eq!(info.column_names, vec!["date", "value"]);
        assert_eq!(info.null_counts.get("date"), Some(1));
        assert_eq!(info.null_counts.get("value"), Some(2));
    }
}
