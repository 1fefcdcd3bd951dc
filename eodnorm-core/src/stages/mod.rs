//! Pipeline stages, in execution order.

pub mod fields;
pub mod align;
pub mod mask;
pub mod change;
pub mod outlier;
pub mod adjust;
pub mod rebase;

pub use fields::{FieldMapper, MappedTable};
pub use align::{align, extract_rows, restrict, Alignment, DateWindow, ExtractedRows};
pub use mask::mask_invalid;
pub use change::{apply_change, calc_change, forward_fill, relative_change};
pub use outlier::{OutlierCorrector, OutlierOutcome};
pub use adjust::{adjustment_factors, apply_adjustment};
pub use rebase::{first_close, rebase, Rebase};
