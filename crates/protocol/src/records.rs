//! Records exchanged with the dashboard server.
//!
//! The metric endpoint replies with `{ "data": [MetricRecord, ...] }`. Only
//! the five fields used for plotting are required; the remaining fields the
//! server attaches are kept when present so they can be shown or exported.

use serde::{Deserialize, Deserializer, Serialize};

/// One metric value measured on one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub site_name: String,
    /// Scan type description. Missing or `null` is read as an empty string.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub scan_description: String,
    /// Session identifier used for drill-through. The server sends a
    /// numeric database id; names are accepted too.
    #[serde(deserialize_with = "string_or_number")]
    pub session_id: String,
    pub session_name: String,
    /// Metric value. The server sends `null` for values it never stored;
    /// those read as NaN and are not plotted.
    #[serde(deserialize_with = "null_as_nan")]
    pub value: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrictype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scantype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_name: Option<String>,
}

impl MetricRecord {
    /// Record with only the plotted fields set.
    pub fn new(
        site_name: impl Into<String>,
        scan_description: impl Into<String>,
        session_id: impl Into<String>,
        session_name: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            site_name: site_name.into(),
            scan_description: scan_description.into(),
            session_id: session_id.into(),
            session_name: session_name.into(),
            value,
            metrictype: None,
            scan_id: None,
            scan_name: None,
            scantype: None,
            site_id: None,
            study_id: None,
            study_name: None,
        }
    }
}

/// HTTP envelope of the metric endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricResponse {
    pub data: Vec<MetricRecord>,
}

/// One row of the QC record search view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QcSearchRecord {
    pub name: String,
    #[serde(default)]
    pub approved: Option<bool>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl QcSearchRecord {
    /// Table cells for this row. `null` fields render as empty strings.
    pub fn cells(&self) -> [String; 3] {
        [
            self.name.clone(),
            self.approved.map(|a| a.to_string()).unwrap_or_default(),
            self.comment.clone().unwrap_or_default(),
        ]
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_nan<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Unsigned(n) => n.to_string(),
        Id::Signed(n) => n.to_string(),
    })
}
