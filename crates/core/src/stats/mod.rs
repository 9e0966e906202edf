pub mod outlier;

pub use outlier::{Classification, OutlierFilter, OutlierReport, SeriesStats};
