//! Calendar alignment.
//!
//! Turns a mapped table into canonical rows, deduplicates by date and
//! reindexes onto the trading calendar. Calendar days missing from the raw
//! data become placeholder rows with every value null; nothing is
//! forward-filled here.

use super::fields::MappedTable;
use crate::calendar::{parse_trading_date, TradingCalendar};
use crate::domain::{CanonicalRow, Field, OptionalFields};
use crate::error::NormalizeError;
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::{HashMap, HashSet};

/// Rows extracted from a mapped table, before alignment.
#[derive(Debug, Clone)]
pub struct ExtractedRows {
    pub rows: Vec<CanonicalRow>,
    pub fields: OptionalFields,
    pub unparsable_dates: usize,
}

/// Read canonical rows out of a mapped table.
///
/// `date` and `volume` are required. Other source fields may be absent and
/// are then null on every row. Non-numeric cells and non-finite numbers
/// become null.
pub fn extract_rows(table: &MappedTable, date_format: &str) -> Result<ExtractedRows, NormalizeError> {
    let frame = &table.frame;
    if !table.has_column("date") {
        return Err(NormalizeError::MissingColumn("date"));
    }
    if !table.has_column(Field::Volume.name()) {
        return Err(NormalizeError::MissingColumn("volume"));
    }

    let dates = date_column(frame, date_format)?;
    let unparsable_dates = dates.iter().filter(|d| d.is_none()).count();
    let mut rows: Vec<CanonicalRow> = dates
        .into_iter()
        .map(|date| CanonicalRow {
            date,
            ..CanonicalRow::default()
        })
        .collect();

    for field in Field::SOURCE {
        if let Some(values) = float_column(frame, field.name())? {
            for (row, value) in rows.iter_mut().zip(values) {
                *row.get_mut(field) = value;
            }
        }
    }

    Ok(ExtractedRows {
        rows,
        fields: OptionalFields {
            amount: table.has_column(Field::Amount.name()),
            adjclose: table.has_column(Field::AdjClose.name()),
        },
        unparsable_dates,
    })
}

fn date_column(frame: &DataFrame, format: &str) -> Result<Vec<Option<NaiveDate>>, NormalizeError> {
    let column = frame.column("date")?.cast(&DataType::String)?;
    let dates = column
        .str()?
        .into_iter()
        .map(|value| value.and_then(|s| parse_trading_date(s, format)))
        .collect();
    Ok(dates)
}

fn float_column(frame: &DataFrame, name: &str) -> Result<Option<Vec<Option<f64>>>, NormalizeError> {
    if frame.get_column_index(name).is_none() {
        return Ok(None);
    }
    let column = frame.column(name)?.cast(&DataType::Float64)?;
    let values = column
        .f64()?
        .into_iter()
        .map(|value| value.filter(|v| v.is_finite()))
        .collect();
    Ok(Some(values))
}

/// Output of [`align`].
#[derive(Debug, Clone)]
pub struct Alignment {
    pub rows: Vec<CanonicalRow>,
    pub duplicates_dropped: usize,
    pub calendar_applied: bool,
    /// Placeholder rows inserted for calendar days absent from the raw data.
    pub gap_rows: usize,
    /// Raw rows discarded because their date is not a calendar day.
    pub off_calendar_rows: usize,
}

/// Inclusive date bounds applied to raw rows before alignment.
///
/// An unbounded window keeps everything. A bounded one drops rows whose
/// date is null, since they cannot be placed inside it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, date: Option<NaiveDate>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        date.is_some_and(|d| {
            self.start.map_or(true, |s| d >= s) && self.end.map_or(true, |e| d <= e)
        })
    }
}

/// Drop rows outside the window. Returns how many were dropped.
pub fn restrict(rows: &mut Vec<CanonicalRow>, window: DateWindow) -> usize {
    let before = rows.len();
    rows.retain(|r| window.contains(r.date));
    before - rows.len()
}

/// Deduplicate, reindex onto the calendar (when given), sort ascending.
///
/// The first occurrence of a date wins. With a calendar the output covers
/// every trading day between the earliest and latest parsed raw date;
/// null-dated rows are dropped. Without one, null-dated rows sort last.
pub fn align(rows: Vec<CanonicalRow>, calendar: Option<&TradingCalendar>) -> Alignment {
    let before = rows.len();
    let mut seen = HashSet::with_capacity(before);
    let mut rows: Vec<CanonicalRow> = rows.into_iter().filter(|r| seen.insert(r.date)).collect();
    let duplicates_dropped = before - rows.len();

    let Some(calendar) = calendar else {
        rows.sort_by_key(|r| (r.date.is_none(), r.date));
        return Alignment {
            rows,
            duplicates_dropped,
            calendar_applied: false,
            gap_rows: 0,
            off_calendar_rows: 0,
        };
    };

    let span = rows
        .iter()
        .filter_map(|r| r.date)
        .fold(None, |acc: Option<(NaiveDate, NaiveDate)>, d| match acc {
            None => Some((d, d)),
            Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
        });

    let kept_input = rows.len();
    let mut by_date: HashMap<NaiveDate, CanonicalRow> = rows
        .into_iter()
        .filter_map(|r| r.date.map(|d| (d, r)))
        .collect();

    let axis = match span {
        Some((start, end)) => calendar.between(start, end),
        None => &[],
    };

    let mut gap_rows = 0;
    let aligned: Vec<CanonicalRow> = axis
        .iter()
        .map(|date| {
            by_date.remove(date).unwrap_or_else(|| {
                gap_rows += 1;
                CanonicalRow::placeholder(*date)
            })
        })
        .collect();

    let off_calendar_rows = kept_input - (aligned.len() - gap_rows);

    Alignment {
        rows: aligned,
        duplicates_dropped,
        calendar_applied: true,
        gap_rows,
        off_calendar_rows,
    }
}
