//! Corporate-action adjustment from the vendor's adjusted close.

use super::change::forward_fill;
use crate::domain::row::{checked_div, checked_mul};
use crate::domain::{CanonicalRow, Field};

/// Adjustment factor per row.
///
/// With an adjusted close: `adjclose / close`, forward-filled over rows
/// where either is null. Leading rows with no factor yet stay null.
/// Without one: 1 everywhere.
pub fn adjustment_factors(rows: &[CanonicalRow], has_adjclose: bool) -> Vec<Option<f64>> {
    if !has_adjclose {
        return vec![Some(1.0); rows.len()];
    }
    forward_fill(rows.iter().map(|r| checked_div(r.adjclose, r.close)), None)
}

/// Multiply open/high/low/close by the factor and divide volume by it.
///
/// Amount and adjclose are left as they are. The factor is stored on rows
/// that traded; masked and gap rows keep a null factor.
pub fn apply_adjustment(rows: &mut [CanonicalRow], has_adjclose: bool) {
    let factors = adjustment_factors(rows, has_adjclose);
    for (row, factor) in rows.iter_mut().zip(factors) {
        let traded = row.has_valid_volume();
        for field in Field::ADJUSTED_PRICES {
            let cell = row.get_mut(field);
            *cell = checked_mul(*cell, factor);
        }
        row.volume = checked_div(row.volume, factor);
        row.factor = if traded { factor } else { None };
    }
}
