//! Domain types for the normalization pipeline

pub mod row;
pub mod series;

pub use row::{CanonicalRow, Field};
pub use series::{NormalizedSeries, OptionalFields};
