pub mod metrics;
pub mod qc_search;

use qc_metrics_protocol::{MetricRecord, QcSearchRecord};
use thiserror::Error;

pub use metrics::parse_metric_response;
pub use qc_search::parse_qc_search;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("metric data: {0}")]
    Metrics(#[from] metrics::MetricsParseError),
    #[error("qc search: {0}")]
    QcSearch(#[from] qc_search::QcSearchParseError),
}

/// Payloads the dashboard endpoints return.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Metrics(Vec<MetricRecord>),
    QcSearch(Vec<QcSearchRecord>),
}

/// Parse a payload of unknown origin, e.g. a file saved from either endpoint.
///
/// Metric records are tried first; a search row lacks `value` so the two
/// shapes never overlap.
pub fn parse_auto(data: &[u8]) -> Result<Payload, ParseError> {
    match parse_metric_response(data) {
        Ok(records) => Ok(Payload::Metrics(records)),
        Err(metrics_err) => match parse_qc_search(data) {
            Ok(rows) if !rows.is_empty() => Ok(Payload::QcSearch(rows)),
            _ => Err(metrics_err.into()),
        },
    }
}
