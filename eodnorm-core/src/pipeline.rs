//! The normalization pipeline.
//!
//! Stages run in a fixed order on a private working copy of the rows:
//!
//! 1. field mapping (vendor -> canonical names)
//! 2. calendar alignment (dedup, reindex, sort)
//! 3. invalid-volume masking
//! 4. x100 outlier correction
//! 5. change computation, then masking again
//! 6. adjustment by `adjclose / close`
//! 7. rebasing on the first valid close
//!
//! The caller's table is only borrowed. The calendar is shared read-only,
//! so one `Normalizer` can serve many symbols concurrently.

use crate::calendar::TradingCalendar;
use crate::config::NormalizeConfig;
use crate::domain::{Field, NormalizedSeries};
use crate::error::NormalizeError;
use crate::report::{NormalizeReport, SeriesStatus};
use crate::stages::{
    align, apply_adjustment, apply_change, extract_rows, mask_invalid, rebase, restrict,
    DateWindow, FieldMapper, OutlierCorrector, Rebase,
};
use crate::stats::NullStats;
use polars::prelude::DataFrame;
use std::sync::Arc;
use tracing::{debug, warn};

/// A normalized series together with its diagnostics.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub series: NormalizedSeries,
    pub report: NormalizeReport,
}

/// Runs the pipeline with a fixed config and an optional calendar.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizeConfig,
    calendar: Option<Arc<TradingCalendar>>,
}

impl Normalizer {
    pub fn new(config: NormalizeConfig, calendar: Option<Arc<TradingCalendar>>) -> Self {
        Self { config, calendar }
    }

    pub fn config(&self) -> &NormalizeConfig {
        &self.config
    }

    pub fn calendar(&self) -> Option<&TradingCalendar> {
        self.calendar.as_deref()
    }

    /// Normalize one symbol's raw table.
    ///
    /// `last_close` seeds the change of the first row, for callers that
    /// normalize a range continuing an earlier one.
    pub fn normalize(
        &self,
        symbol: &str,
        raw: &DataFrame,
        last_close: Option<f64>,
    ) -> Result<Normalized, NormalizeError> {
        self.normalize_within(symbol, raw, last_close, DateWindow::default())
    }

    /// Like [`normalize`](Self::normalize), keeping only raw rows inside
    /// `window`. The rebasing reference is the first valid close inside it.
    pub fn normalize_within(
        &self,
        symbol: &str,
        raw: &DataFrame,
        last_close: Option<f64>,
        window: DateWindow,
    ) -> Result<Normalized, NormalizeError> {
        let mapped = FieldMapper::new(&self.config.fields).map(raw)?;
        let mut extracted = extract_rows(&mapped, &self.config.date_format)?;
        if extracted.unparsable_dates > 0 {
            warn!(
                symbol,
                count = extracted.unparsable_dates,
                "unparseable dates treated as missing"
            );
        }
        let fields = extracted.fields;
        let stats_fields: Vec<Field> = Field::ALL
            .into_iter()
            .filter(|f| fields.contains(*f))
            .collect();
        NullStats::of(&extracted.rows, &stats_fields).log(symbol, "mapped");

        let outside_window = restrict(&mut extracted.rows, window);
        if outside_window > 0 {
            debug!(symbol, dropped = outside_window, "rows outside requested window");
        }

        let aligned = align(extracted.rows, self.calendar());
        if !aligned.calendar_applied {
            debug!(symbol, "no calendar; keeping raw date axis");
        }
        let mut rows = aligned.rows;
        NullStats::of(&rows, &stats_fields).log(symbol, "aligned");

        let masked_rows = mask_invalid(&mut rows);
        NullStats::of(&rows, &stats_fields).log(symbol, "masked");

        let outlier = OutlierCorrector::new(&self.config.outlier).correct(symbol, &mut rows, last_close);

        apply_change(&mut rows, last_close);
        mask_invalid(&mut rows);

        apply_adjustment(&mut rows, fields.adjclose);

        let rebased = rebase(&mut rows);
        let status = SeriesStatus::from_rebase(&rebased);
        match rebased {
            Rebase::Anchored { .. } => {}
            Rebase::NoReference => {
                warn!(symbol, "no valid close; series left unrebased");
            }
            Rebase::DegenerateReference { reference_close } => {
                warn!(symbol, reference_close, "reference close is not usable for rebasing");
            }
        }
        NullStats::of(&rows, &stats_fields).log(symbol, "normalized");

        let report = NormalizeReport {
            symbol: symbol.to_string(),
            raw_rows: raw.height(),
            mapped_fields: mapped.mapped,
            missing_fields: mapped.missing,
            dropped_symbol_column: mapped.dropped_symbol_column,
            shadowed_columns: mapped.shadowed,
            unparsable_dates: extracted.unparsable_dates,
            outside_window,
            duplicate_dates: aligned.duplicates_dropped,
            calendar_applied: aligned.calendar_applied,
            gap_rows: aligned.gap_rows,
            off_calendar_rows: aligned.off_calendar_rows,
            masked_rows,
            outlier,
            reference_close: rebased.reference_close(),
            status,
            output_rows: rows.len(),
        };

        Ok(Normalized {
            series: NormalizedSeries::new(symbol, fields, rows, rebased.is_anchored()),
            report,
        })
    }
}
