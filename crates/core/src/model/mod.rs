pub mod group;
pub mod pivot;

pub use group::{GroupBy, GroupKey};
pub use pivot::{PivotResult, Series, SeriesBundle, pivot};
