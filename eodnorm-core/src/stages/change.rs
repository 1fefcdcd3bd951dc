//! Day-over-day change and forward fill.

use crate::domain::row::checked_div;
use crate::domain::CanonicalRow;

/// Carry the last non-null value forward through nulls.
///
/// The carried value starts at `seed`. With no seed, leading nulls stay
/// null; an all-null input stays all-null.
pub fn forward_fill(
    values: impl IntoIterator<Item = Option<f64>>,
    seed: Option<f64>,
) -> Vec<Option<f64>> {
    let mut last = seed;
    values
        .into_iter()
        .map(|v| {
            if v.is_some() {
                last = v;
            }
            last
        })
        .collect()
}

/// `current / previous - 1`, null when either side is null or `previous`
/// is zero.
pub fn relative_change(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    checked_div(current, previous).map(|ratio| ratio - 1.0)
}

/// Change series over the forward-filled close.
///
/// Row 0 is compared against `last_close` when supplied and is null
/// otherwise. Pure: the rows are only read.
pub fn calc_change(rows: &[CanonicalRow], last_close: Option<f64>) -> Vec<Option<f64>> {
    let filled = forward_fill(rows.iter().map(|r| r.close), last_close);
    filled
        .iter()
        .enumerate()
        .map(|(t, current)| {
            let previous = if t == 0 { last_close } else { filled[t - 1] };
            relative_change(*current, previous)
        })
        .collect()
}

/// Store the change series on the rows.
pub fn apply_change(rows: &mut [CanonicalRow], last_close: Option<f64>) {
    let change = calc_change(rows, last_close);
    for (row, value) in rows.iter_mut().zip(change) {
        row.change = value;
    }
}
