//! Vendor -> canonical column mapping.

use crate::config::FieldMapping;
use crate::error::NormalizeError;
use polars::prelude::*;
use tracing::{debug, warn};

/// A raw table with canonical column names.
#[derive(Debug, Clone)]
pub struct MappedTable {
    pub frame: DataFrame,
    /// `(vendor, canonical)` pairs that were applied.
    pub mapped: Vec<(String, String)>,
    /// Vendor columns named by the mapping but absent from the table.
    pub missing: Vec<String>,
    pub dropped_symbol_column: bool,
    /// Unmapped raw columns dropped because a mapped field takes their name.
    pub shadowed: Vec<String>,
}

impl MappedTable {
    pub fn has_column(&self, name: &str) -> bool {
        self.frame.get_column_index(name).is_some()
    }
}

/// Renames vendor columns according to a [`FieldMapping`].
pub struct FieldMapper<'a> {
    mapping: &'a FieldMapping,
}

impl<'a> FieldMapper<'a> {
    pub fn new(mapping: &'a FieldMapping) -> Self {
        Self { mapping }
    }

    /// Map a raw table. The input frame is left untouched.
    ///
    /// Absent source columns are skipped with a warning; the vendor symbol
    /// column is dropped when it differs from the canonical `symbol`. An
    /// unmapped raw column already carrying a canonical name gives way to
    /// the mapped field.
    pub fn map(&self, raw: &DataFrame) -> Result<MappedTable, NormalizeError> {
        let mut frame = raw.clone();
        let mut mapped = Vec::new();
        let mut missing = Vec::new();

        let mut shadowed = Vec::new();

        for (vendor, canonical) in &self.mapping.columns {
            if frame.get_column_index(vendor).is_none() {
                warn!(field = %vendor, "vendor field not found in data");
                missing.push(vendor.clone());
                continue;
            }
            if vendor != canonical {
                if mapped.iter().any(|(_, c)| c == canonical) {
                    warn!(field = %vendor, target = %canonical, "target already mapped; keeping the first");
                    continue;
                }
                if frame.get_column_index(canonical).is_some()
                    && self.mapping.columns.contains_key(canonical)
                {
                    warn!(field = %vendor, target = %canonical, "target is itself a mapped field; skipping");
                    continue;
                }
                if frame.get_column_index(canonical).is_some() {
                    warn!(column = %canonical, field = %vendor, "raw column shadowed by mapped field; dropped");
                    frame = frame.drop(canonical)?;
                    shadowed.push(canonical.clone());
                }
                frame.rename(vendor, canonical.as_str().into())?;
            }
            mapped.push((vendor.clone(), canonical.clone()));
        }

        let mut dropped_symbol_column = false;
        if let Some(symbol_column) = &self.mapping.symbol_column {
            if symbol_column != "symbol" && frame.get_column_index(symbol_column).is_some() {
                frame = frame.drop(symbol_column)?;
                dropped_symbol_column = true;
                debug!(column = %symbol_column, "dropped vendor symbol column");
            }
        }

        debug!(mapped = mapped.len(), missing = missing.len(), "mapped vendor fields");

        Ok(MappedTable {
            frame,
            mapped,
            missing,
            dropped_symbol_column,
            shadowed,
        })
    }
}
