//! Null-cell statistics, logged between pipeline stages.

use crate::domain::{CanonicalRow, Field};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NullStats {
    pub rows: usize,
    pub total_cells: usize,
    pub null_cells: usize,
    /// Per-field null counts, only fields with at least one null.
    pub by_field: Vec<(Field, usize)>,
}

impl NullStats {
    pub fn of(rows: &[CanonicalRow], fields: &[Field]) -> Self {
        let by_field: Vec<(Field, usize)> = fields
            .iter()
            .map(|&f| (f, rows.iter().filter(|r| r.get(f).is_none()).count()))
            .filter(|(_, n)| *n > 0)
            .collect();
        Self {
            rows: rows.len(),
            total_cells: rows.len() * fields.len(),
            null_cells: by_field.iter().map(|(_, n)| n).sum(),
            by_field,
        }
    }

    /// Share of null cells in percent; 0 for an empty table.
    pub fn null_pct(&self) -> f64 {
        if self.total_cells == 0 {
            0.0
        } else {
            self.null_cells as f64 / self.total_cells as f64 * 100.0
        }
    }

    pub fn log(&self, symbol: &str, stage: &str) {
        debug!(
            symbol,
            stage,
            rows = self.rows,
            null_cells = self.null_cells,
            null_pct = %format!("{:.2}", self.null_pct()),
            by_field = ?self.by_field,
            "null statistics"
        );
    }
}
