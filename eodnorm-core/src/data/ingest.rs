use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

/// Reads raw vendor tables from CSV and Parquet files.
///
/// No schema is imposed: vendor columns are inferred and mapped later by
/// the pipeline's field mapper.
pub struct RawIngestor {
    infer_schema_length: Option<usize>,
}

impl RawIngestor {
    pub fn new() -> Self {
        Self {
            infer_schema_length: Some(10_000),
        }
    }

    /// Scan the whole file before choosing column types.
    pub fn with_full_inference(mut self) -> Self {
        self.infer_schema_length = None;
        self
    }

    /// Ingest a CSV file with a header row.
    pub fn ingest_csv(&self, path: &Path) -> Result<DataFrame, DataError> {
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .and_then(|reader| reader.finish())
            .map_err(|e| DataError::IngestFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
    }

    /// Ingest a Parquet file.
    pub fn ingest_parquet(&self, path: &Path) -> Result<DataFrame, DataError> {
        let file = File::open(path).map_err(|e| DataError::IngestFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        ParquetReader::new(file)
            .finish()
            .map_err(|e| DataError::IngestFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
    }

    /// Ingest by file extension (`.parquet`, anything else as CSV).
    pub fn ingest(&self, path: &Path) -> Result<DataFrame, DataError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("parquet") => self.ingest_parquet(path),
            _ => self.ingest_csv(path),
        }
    }
}

impl Default for RawIngestor {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("ingest of {path} failed: {reason}")]
    IngestFailed { path: String, reason: String },

    #[error("write of {path} failed: {reason}")]
    WriteFailed { path: String, reason: String },

    #[error("output schema: {0}")]
    Schema(#[from] super::schema::SchemaError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn ingests_wind_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("600000.SH_2024.csv");
        fs::write(
            &path,
            "S_INFO_WINDCODE,TRADE_DT,S_DQ_CLOSE,S_DQ_VOLUME\n\
             600000.SH,20240102,10.5,1000\n\
             600000.SH,20240103,10.7,\n",
        )
        .unwrap();

        let df = RawIngestor::new().ingest(&path).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 4);
        assert!(df.get_column_index("TRADE_DT").is_some());
        assert_eq!(df.column("S_DQ_VOLUME").unwrap().null_count(), 1);
    }

    #[test]
    fn missing_file_is_an_ingest_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = RawIngestor::new().ingest(&dir.path().join("nope.csv"));
        assert!(matches!(result, Err(DataError::IngestFailed { .. })));
    }
}
