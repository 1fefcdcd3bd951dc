//! Invalid-volume masking.

use crate::domain::CanonicalRow;

/// Null every value on rows whose volume is missing or non-positive.
///
/// Returns how many rows still carried data before being cleared. Gap
/// placeholders are already void and are not counted.
pub fn mask_invalid(rows: &mut [CanonicalRow]) -> usize {
    let mut cleared = 0;
    for row in rows.iter_mut().filter(|r| !r.has_valid_volume()) {
        if !row.is_void() {
            cleared += 1;
        }
        row.clear_values();
    }
    cleared
}
