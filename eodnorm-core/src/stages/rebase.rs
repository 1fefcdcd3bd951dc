//! Baseline rebasing on the first valid close.

use crate::domain::row::{checked_div, checked_mul};
use crate::domain::{CanonicalRow, Field};
use serde::{Deserialize, Serialize};

/// Fields divided by the reference close. Volume is multiplied instead;
/// adjclose and change are never rebased.
const DIVIDED: [Field; 6] = [
    Field::Open,
    Field::High,
    Field::Low,
    Field::Close,
    Field::Amount,
    Field::Factor,
];

/// Outcome of rebasing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rebase {
    /// Anchored on a non-zero, finite reference close.
    Anchored { reference_close: f64 },
    /// No row has a close; the series was left as is.
    NoReference,
    /// The first close is zero or non-finite. Divided cells are null and
    /// volume is left unscaled.
    DegenerateReference { reference_close: f64 },
}

impl Rebase {
    pub fn reference_close(&self) -> Option<f64> {
        match self {
            Rebase::Anchored { reference_close }
            | Rebase::DegenerateReference { reference_close } => Some(*reference_close),
            Rebase::NoReference => None,
        }
    }

    pub fn is_anchored(&self) -> bool {
        matches!(self, Rebase::Anchored { .. })
    }
}

/// Close of the first row (ascending) that has one.
pub fn first_close(rows: &[CanonicalRow]) -> Option<f64> {
    rows.iter().find_map(|r| r.close)
}

/// Rescale every row relative to the first valid close.
pub fn rebase(rows: &mut [CanonicalRow]) -> Rebase {
    let Some(c0) = first_close(rows) else {
        return Rebase::NoReference;
    };

    let anchored = c0.is_finite() && c0 != 0.0;
    for row in rows.iter_mut() {
        for field in DIVIDED {
            let cell = row.get_mut(field);
            *cell = checked_div(*cell, Some(c0));
        }
        if anchored {
            row.volume = checked_mul(row.volume, Some(c0));
        }
    }

    if anchored {
        Rebase::Anchored { reference_close: c0 }
    } else {
        Rebase::DegenerateReference { reference_close: c0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(day: u32, close: Option<f64>, volume: Option<f64>) -> CanonicalRow {
        CanonicalRow {
            date: NaiveDate::from_ymd_opt(2024, 1, day),
            open: close,
            high: close.map(|c| c * 2.0),
            low: close,
            close,
            volume,
            amount: close.map(|c| c * 10.0),
            adjclose: close,
            change: Some(0.5),
            factor: Some(1.0),
        }
    }

    #[test]
    fn first_valid_close_becomes_one() {
        let mut rows = vec![
            CanonicalRow::placeholder(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            row(2, Some(8.0), Some(50.0)),
            row(3, Some(16.0), Some(25.0)),
        ];
        let outcome = rebase(&mut rows);

        assert_eq!(outcome, Rebase::Anchored { reference_close: 8.0 });
        assert!(rows[0].is_void());
        assert_eq!(rows[1].close, Some(1.0));
        assert_eq!(rows[1].volume, Some(400.0));
        assert_eq!(rows[1].high, Some(2.0));
        assert_eq!(rows[1].amount, Some(10.0));
        assert_eq!(rows[1].factor, Some(0.125));
        assert_eq!(rows[2].close, Some(2.0));
        assert_eq!(rows[2].volume, Some(200.0));
    }

    #[test]
    fn adjclose_and_change_are_not_rebased() {
        let mut rows = vec![row(2, Some(4.0), Some(1.0))];
        rebase(&mut rows);
        assert_eq!(rows[0].adjclose, Some(4.0));
        assert_eq!(rows[0].change, Some(0.5));
    }

    #[test]
    fn no_close_is_a_no_op() {
        let mut rows = vec![row(2, None, Some(10.0))];
        let before = rows.clone();
        assert_eq!(rebase(&mut rows), Rebase::NoReference);
        assert_eq!(rows, before);
    }

    #[test]
    fn zero_reference_nulls_divided_cells() {
        let mut rows = vec![row(2, Some(0.0), Some(10.0)), row(3, Some(5.0), Some(10.0))];
        let outcome = rebase(&mut rows);
        assert_eq!(outcome, Rebase::DegenerateReference { reference_close: 0.0 });
        assert_eq!(rows[1].close, None);
        assert_eq!(rows[1].factor, None);
        assert_eq!(rows[1].volume, Some(10.0));
    }
}
