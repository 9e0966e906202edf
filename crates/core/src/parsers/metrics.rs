use qc_metrics_protocol::{MetricRecord, MetricResponse};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a `data` array or a bare array of records")]
    UnknownFormat,
}

/// Parse a reply of the metric data endpoint.
///
/// The HTTP output wraps records as `{ "data": [...] }`; the pretty output
/// mode of the same endpoint is a bare array. Both are accepted.
pub fn parse_metric_response(data: &[u8]) -> Result<Vec<MetricRecord>, MetricsParseError> {
    let value: Value = serde_json::from_slice(data)?;
    let records = if value.get("data").is_some_and(Value::is_array) {
        serde_json::from_value::<MetricResponse>(value)?.data
    } else if value.is_array() {
        serde_json::from_value::<Vec<MetricRecord>>(value)?
    } else {
        return Err(MetricsParseError::UnknownFormat);
    };
    tracing::debug!(records = records.len(), "parsed metric response");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENVELOPE: &str = r#"{"data": [
        {"site_name": "CMH", "scan_description": "T1", "session_id": 17,
         "session_name": "SPN01_CMH_0001_01", "value": 0.81,
         "metrictype": "snr", "scan_id": 88, "site_id": 2},
        {"site_name": "ZHH", "scan_description": null, "session_id": "18",
         "session_name": "SPN01_ZHH_0001_01", "value": 0.77}
    ]}"#;

    #[test]
    fn parses_envelope() {
        let records = parse_metric_response(ENVELOPE.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].session_id, "17");
        assert_eq!(records[0].scan_id, Some(88));
        assert_eq!(records[1].scan_description, "");
    }

    #[test]
    fn parses_bare_array() {
        let json = r#"[{"site_name":"CMH","scan_description":"DTI","session_id":"1",
                        "session_name":"a","value":2.5}]"#;
        let records = parse_metric_response(json.as_bytes()).unwrap();
        assert_eq!(records[0].value, 2.5);
    }

    #[test]
    fn null_value_keeps_the_rest_of_the_reply() {
        let json = br#"{"data":[
            {"site_name":"CMH","scan_description":"T1","session_id":1,"session_name":"a","value":1.5},
            {"site_name":"CMH","scan_description":"T1","session_id":2,"session_name":"b","value":null}]}"#;
        let records = parse_metric_response(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].value, 1.5);
        assert!(records[1].value.is_nan());
    }

    #[test]
    fn empty_data_is_not_an_error() {
        assert!(parse_metric_response(br#"{"data": []}"#).unwrap().is_empty());
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(matches!(
            parse_metric_response(br#"{"rows": []}"#),
            Err(MetricsParseError::UnknownFormat)
        ));
        assert!(matches!(
            parse_metric_response(br#"[{"site_name": "CMH"}]"#),
            Err(MetricsParseError::Json(_))
        ));
    }
}
