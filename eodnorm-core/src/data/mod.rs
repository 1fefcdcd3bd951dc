//! Reading raw vendor tables and writing normalized output

pub mod ingest;
pub mod export;
pub mod schema;

pub use ingest::{DataError, RawIngestor};
pub use export::{output_path, write_series, OutputFormat};
pub use schema::{SchemaError, SeriesSchema};
