use polars::prelude::PolarsError;
use thiserror::Error;

/// Structural failures that abort a single pipeline invocation.
///
/// Data-quality problems (missing optional columns, bad dates, anomalies,
/// an unusable series) are reported through `NormalizeReport` instead.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("required column `{0}` missing after field mapping")]
    MissingColumn(&'static str),

    #[error("table error: {0}")]
    Table(#[from] PolarsError),
}
