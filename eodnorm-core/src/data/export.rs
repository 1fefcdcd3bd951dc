//! Writing normalized series to disk.
//!
//! Writes are atomic: the table goes to `{path}.tmp` first and is renamed
//! into place, so a crashed run never leaves a half-written output.

use super::ingest::DataError;
use super::schema::SeriesSchema;
use crate::domain::NormalizedSeries;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

/// Output path for a symbol: `{dir}/{symbol}.{ext}`.
pub fn output_path(dir: &Path, symbol: &str, format: OutputFormat) -> PathBuf {
    dir.join(format!("{symbol}.{}", format.extension()))
}

/// Write a series, validating it against the output schema first.
pub fn write_series(
    series: &NormalizedSeries,
    path: &Path,
    format: OutputFormat,
    include_symbol: bool,
) -> Result<(), DataError> {
    let write_err = |reason: String| DataError::WriteFailed {
        path: path.display().to_string(),
        reason,
    };

    let mut df = series
        .to_dataframe(include_symbol)
        .map_err(|e| write_err(format!("dataframe creation: {e}")))?;
    SeriesSchema::validate(&df, &SeriesSchema::schema(series.fields(), include_symbol))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| write_err(format!("create dir: {e}")))?;
    }

    let tmp_path = path.with_extension(format!("{}.tmp", format.extension()));
    let file = fs::File::create(&tmp_path).map_err(|e| write_err(format!("create file: {e}")))?;
    let written = match format {
        OutputFormat::Csv => CsvWriter::new(file)
            .include_header(true)
            .finish(&mut df)
            .map(|_| ()),
        OutputFormat::Parquet => ParquetWriter::new(file).finish(&mut df).map(|_| ()),
    };
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(write_err(e.to_string()));
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        write_err(format!("atomic rename failed: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ingest::RawIngestor;
    use crate::domain::{CanonicalRow, OptionalFields};
    use chrono::NaiveDate;

    fn sample_series() -> NormalizedSeries {
        let rows = vec![
            CanonicalRow {
                close: Some(1.0),
                volume: Some(1_000.0),
                factor: Some(0.1),
                ..CanonicalRow::placeholder(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
            },
            CanonicalRow::placeholder(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()),
        ];
        NormalizedSeries::new("600000.SH", OptionalFields::default(), rows, true)
    }

    #[test]
    fn csv_output_is_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = output_path(dir.path(), "600000.SH", OutputFormat::Csv);
        write_series(&sample_series(), &path, OutputFormat::Csv, true).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("csv.tmp").exists());
        let df = RawIngestor::new().ingest(&path).unwrap();
        assert_eq!(df.height(), 2);
        assert!(df.get_column_index("symbol").is_some());
        assert_eq!(df.column("close").unwrap().null_count(), 1);
    }

    #[test]
    fn parquet_output_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = output_path(dir.path(), "600000.SH", OutputFormat::Parquet);
        write_series(&sample_series(), &path, OutputFormat::Parquet, false).unwrap();

        let df = RawIngestor::new().ingest(&path).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("date").unwrap().dtype(), &DataType::Date);
        assert!(df.get_column_index("symbol").is_none());
    }
}
