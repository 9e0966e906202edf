use qc_metrics_protocol::QcSearchRecord;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QcSearchParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SearchReply {
    Bare(Vec<QcSearchRecord>),
    Wrapped { data: Vec<QcSearchRecord> },
}

/// Parse the rows returned by the QC record search view.
pub fn parse_qc_search(data: &[u8]) -> Result<Vec<QcSearchRecord>, QcSearchParseError> {
    let rows = match serde_json::from_slice::<SearchReply>(data)? {
        SearchReply::Bare(rows) | SearchReply::Wrapped { data: rows } => rows,
    };
    Ok(rows)
}
