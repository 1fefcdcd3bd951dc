//! CanonicalRow, the working unit of the normalization pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A numeric field of a canonical row.
///
/// `Change` and `Factor` are derived by the pipeline; the rest come from
/// the vendor table through the field mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Open,
    High,
    Low,
    Close,
    Volume,
    Amount,
    AdjClose,
    Change,
    Factor,
}

impl Field {
    /// Every value field, in output column order.
    pub const ALL: [Field; 9] = [
        Field::Open,
        Field::High,
        Field::Low,
        Field::Close,
        Field::Volume,
        Field::Amount,
        Field::AdjClose,
        Field::Change,
        Field::Factor,
    ];

    /// Fields read from the mapped vendor table.
    pub const SOURCE: [Field; 7] = [
        Field::Open,
        Field::High,
        Field::Low,
        Field::Close,
        Field::Volume,
        Field::Amount,
        Field::AdjClose,
    ];

    /// Price-bearing fields rescaled by the outlier corrector.
    pub const SCALED_PRICES: [Field; 5] = [
        Field::High,
        Field::Close,
        Field::Low,
        Field::Open,
        Field::AdjClose,
    ];

    /// Prices multiplied by the adjustment factor.
    pub const ADJUSTED_PRICES: [Field; 4] = [Field::Open, Field::High, Field::Low, Field::Close];

    /// Canonical column name.
    pub fn name(self) -> &'static str {
        match self {
            Field::Open => "open",
            Field::High => "high",
            Field::Low => "low",
            Field::Close => "close",
            Field::Volume => "volume",
            Field::Amount => "amount",
            Field::AdjClose => "adjclose",
            Field::Change => "change",
            Field::Factor => "factor",
        }
    }

    /// Look up a field by its canonical column name.
    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.name() == name)
    }
}

/// One trading day of a single symbol.
///
/// Every value is optional: `None` is the null cell. Rows inserted for
/// calendar gaps carry a date and nothing else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRow {
    /// `None` when the vendor date could not be parsed.
    pub date: Option<NaiveDate>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
    pub amount: Option<f64>,
    pub adjclose: Option<f64>,
    pub change: Option<f64>,
    pub factor: Option<f64>,
}

impl CanonicalRow {
    /// An all-null row for a calendar date missing from the raw data.
    pub fn placeholder(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            ..Self::default()
        }
    }

    pub fn get(&self, field: Field) -> Option<f64> {
        match field {
            Field::Open => self.open,
            Field::High => self.high,
            Field::Low => self.low,
            Field::Close => self.close,
            Field::Volume => self.volume,
            Field::Amount => self.amount,
            Field::AdjClose => self.adjclose,
            Field::Change => self.change,
            Field::Factor => self.factor,
        }
    }

    pub fn get_mut(&mut self, field: Field) -> &mut Option<f64> {
        match field {
            Field::Open => &mut self.open,
            Field::High => &mut self.high,
            Field::Low => &mut self.low,
            Field::Close => &mut self.close,
            Field::Volume => &mut self.volume,
            Field::Amount => &mut self.amount,
            Field::AdjClose => &mut self.adjclose,
            Field::Change => &mut self.change,
            Field::Factor => &mut self.factor,
        }
    }

    /// True when the row traded: volume present and strictly positive.
    pub fn has_valid_volume(&self) -> bool {
        matches!(self.volume, Some(v) if v > 0.0)
    }

    /// True when every value field is null.
    pub fn is_void(&self) -> bool {
        Field::ALL.iter().all(|f| self.get(*f).is_none())
    }

    /// Null every value field. The date key is kept.
    pub fn clear_values(&mut self) {
        for field in Field::ALL {
            *self.get_mut(field) = None;
        }
    }
}

/// Divide, yielding null instead of infinity or NaN.
pub(crate) fn checked_div(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let (n, d) = (numerator?, denominator?);
    if d == 0.0 {
        return None;
    }
    let q = n / d;
    q.is_finite().then_some(q)
}

/// Multiply, yielding null instead of infinity or NaN.
pub(crate) fn checked_mul(lhs: Option<f64>, rhs: Option<f64>) -> Option<f64> {
    let p = lhs? * rhs?;
    p.is_finite().then_some(p)
}
