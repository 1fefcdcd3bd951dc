//! Trading calendar: the authoritative axis for reindexing.
//!
//! Loaded once by the caller and shared read-only (typically behind an
//! `Arc`) across every per-symbol pipeline invocation.

use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

const ISO_FORMAT: &str = "%Y-%m-%d";
const COMPACT_FORMAT: &str = "%Y%m%d";

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("failed to read calendar {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("calendar {path} contains no parseable dates")]
    Empty { path: PathBuf },
}

/// Ascending, duplicate-free list of trading days.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradingCalendar {
    dates: Vec<NaiveDate>,
}

impl TradingCalendar {
    /// Build from dates in any order; duplicates are removed.
    pub fn from_dates(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        let mut dates: Vec<NaiveDate> = dates.into_iter().collect();
        dates.sort_unstable();
        dates.dedup();
        Self { dates }
    }

    /// Parse newline-delimited calendar content.
    ///
    /// Blank lines are ignored and unparseable lines are skipped with a
    /// warning.
    pub fn parse(content: &str) -> Self {
        let mut skipped = 0usize;
        let dates: Vec<NaiveDate> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| {
                let date = parse_trading_date(line, COMPACT_FORMAT);
                if date.is_none() {
                    skipped += 1;
                    warn!(line, "skipping unparseable calendar line");
                }
                date
            })
            .collect();
        if skipped > 0 {
            warn!(skipped, "calendar contained unparseable lines");
        }
        Self::from_dates(dates)
    }

    /// Load a calendar file.
    pub fn load(path: &Path) -> Result<Self, CalendarError> {
        let content = fs::read_to_string(path).map_err(|source| CalendarError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let calendar = Self::parse(&content);
        match (calendar.first(), calendar.last()) {
            (Some(first), Some(last)) => {
                info!(
                    path = %path.display(),
                    days = calendar.len(),
                    %first,
                    %last,
                    "loaded trading calendar"
                );
                Ok(calendar)
            }
            _ => Err(CalendarError::Empty {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Load a calendar, degrading to `None` when it is missing or unusable.
    ///
    /// Without a calendar the pipeline keeps each table's own date axis.
    pub fn load_optional(path: &Path) -> Option<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "calendar file not found; reindexing disabled");
            return None;
        }
        match Self::load(path) {
            Ok(calendar) => Some(calendar),
            Err(e) => {
                warn!(error = %e, "calendar unavailable; reindexing disabled");
                None
            }
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn first(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.binary_search(&date).is_ok()
    }

    /// Trading days in `[start, end]`, inclusive on both ends.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> &[NaiveDate] {
        if start > end {
            return &[];
        }
        let lo = self.dates.partition_point(|d| *d < start);
        let hi = self.dates.partition_point(|d| *d <= end);
        &self.dates[lo..hi]
    }
}

/// Parse a vendor or calendar date.
///
/// Tries `format` first, then ISO `YYYY-MM-DD` on the leading ten
/// characters (covers `Date` columns cast to text and datetime strings).
/// A trailing `.0` from float-typed date columns is ignored.
pub fn parse_trading_date(raw: &str, format: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    let s = s.strip_suffix(".0").unwrap_or(s);
    NaiveDate::parse_from_str(s, format)
        .ok()
        .or_else(|| NaiveDate::parse_from_str(s.get(..10)?, ISO_FORMAT).ok())
}
