//! Client-side logic of the QC metrics dashboard: reshape metric records into
//! per-group series, drop outliers, lay the series out as a chart, and drive
//! the fetch / review lifecycle of the dashboard panels.

pub mod config;
pub mod export;
pub mod model;
pub mod navigation;
pub mod panel;
pub mod parsers;
pub mod query;
pub mod review;
pub mod stats;
pub mod svg;
pub mod views;
