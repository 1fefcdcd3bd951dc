//! eodnorm core: end-of-day price normalization.
//!
//! Turns one symbol's raw vendor table into a calendar-aligned,
//! adjustment-consistent, rebased series:
//! - Vendor -> canonical field mapping
//! - Deduplication and reindexing onto a trading calendar
//! - Invalid-volume masking
//! - Iterative x100 scale-error correction
//! - Day-over-day change
//! - Adjustment by the vendor's adjusted close
//! - Rebasing on the first valid close
//!
//! File I/O lives in [`data`]; everything else is pure and operates on a
//! private copy of the input.

pub mod calendar;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod stages;
pub mod stats;

pub use calendar::{CalendarError, TradingCalendar};
pub use config::{ConfigError, FieldMapping, NormalizeConfig, OutlierConfig};
pub use domain::{CanonicalRow, Field, NormalizedSeries, OptionalFields};
pub use error::NormalizeError;
pub use pipeline::{Normalized, Normalizer};
pub use report::{NormalizeReport, SeriesStatus};
