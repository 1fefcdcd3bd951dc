//! Per-invocation diagnostics.

use crate::stages::{OutlierOutcome, Rebase};
use serde::{Deserialize, Serialize};

/// Whether a series can be compared across symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesStatus {
    Usable,
    /// No row has a valid close, so the series is not rebased.
    NoValidClose,
    /// The first close is zero; rebased prices are null.
    DegenerateReference,
}

impl SeriesStatus {
    pub fn from_rebase(rebase: &Rebase) -> Self {
        match rebase {
            Rebase::Anchored { .. } => SeriesStatus::Usable,
            Rebase::NoReference => SeriesStatus::NoValidClose,
            Rebase::DegenerateReference { .. } => SeriesStatus::DegenerateReference,
        }
    }

    pub fn is_usable(&self) -> bool {
        matches!(self, SeriesStatus::Usable)
    }
}

/// What the pipeline did to one symbol's table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizeReport {
    pub symbol: String,
    pub raw_rows: usize,
    /// `(vendor, canonical)` pairs applied by the field mapper.
    pub mapped_fields: Vec<(String, String)>,
    /// Vendor fields named by the mapping but absent from the table.
    pub missing_fields: Vec<String>,
    pub dropped_symbol_column: bool,
    /// Unmapped raw columns dropped because a mapped field took their name.
    pub shadowed_columns: Vec<String>,
    pub unparsable_dates: usize,
    /// Rows dropped by the requested date window.
    pub outside_window: usize,
    pub duplicate_dates: usize,
    pub calendar_applied: bool,
    pub gap_rows: usize,
    pub off_calendar_rows: usize,
    /// Rows with data cleared because of missing or non-positive volume.
    pub masked_rows: usize,
    pub outlier: OutlierOutcome,
    pub reference_close: Option<f64>,
    pub status: SeriesStatus,
    pub output_rows: usize,
}

impl NormalizeReport {
    /// True when the report carries anything a caller should look at.
    pub fn has_warnings(&self) -> bool {
        !self.missing_fields.is_empty()
            || self.unparsable_dates > 0
            || self.outlier.is_persistent()
            || !self.status.is_usable()
    }
}
