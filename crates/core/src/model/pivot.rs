use std::collections::HashMap;

use qc_metrics_protocol::{MetricRecord, PointRef};
use serde::{Deserialize, Serialize};

use super::group::{GroupBy, GroupKey};

/// Parallel per-group sequences. Index `i` of each vector describes the same
/// source record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesBundle {
    pub values: Vec<f64>,
    pub subject_ids: Vec<String>,
    pub session_names: Vec<String>,
}

impl SeriesBundle {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn push(&mut self, record: &MetricRecord) {
        self.values.push(record.value);
        self.subject_ids.push(record.session_id.clone());
        self.session_names.push(record.session_name.clone());
    }

    /// Copy of the bundle keeping only the indices where `keep` is true.
    pub fn retain_by(&self, keep: &[bool]) -> SeriesBundle {
        let mut out = SeriesBundle::default();
        for (i, _) in keep.iter().enumerate().filter(|(_, k)| **k) {
            if let (Some(v), Some(s), Some(n)) = (
                self.values.get(i),
                self.subject_ids.get(i),
                self.session_names.get(i),
            ) {
                out.values.push(*v);
                out.subject_ids.push(s.clone());
                out.session_names.push(n.clone());
            }
        }
        out
    }
}

/// One named series of the chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub key: GroupKey,
    pub bundle: SeriesBundle,
}

/// Metric records regrouped into series, in first-seen key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PivotResult {
    series: Vec<Series>,
}

/// Group `records` by `group_by`.
///
/// Series appear in the order their key is first seen in the input; records
/// within a series keep their input order.
pub fn pivot(records: &[MetricRecord], group_by: GroupBy) -> PivotResult {
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut series: Vec<Series> = Vec::new();

    for record in records {
        let key = group_by.key_for(record);
        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                let slot = series.len();
                index.insert(key.clone(), slot);
                series.push(Series {
                    key,
                    bundle: SeriesBundle::default(),
                });
                slot
            }
        };
        series[slot].bundle.push(record);
    }

    tracing::debug!(
        records = records.len(),
        groups = series.len(),
        ?group_by,
        "pivoted metric records"
    );

    PivotResult { series }
}

impl PivotResult {
    pub fn from_series(series: Vec<Series>) -> Self {
        Self { series }
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    pub fn get(&self, index: usize) -> Option<&Series> {
        self.series.get(index)
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// No groups at all: callers show "no data" instead of a chart.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Longest series length, `None` when there are no groups.
    pub fn max_len(&self) -> Option<usize> {
        self.series.iter().map(|s| s.bundle.len()).max()
    }

    /// Shared category axis `[0, 1, ..., max_len - 1]`.
    pub fn categories(&self) -> Vec<usize> {
        (0..self.max_len().unwrap_or(0)).collect()
    }

    /// Total number of records across all groups.
    pub fn record_count(&self) -> usize {
        self.series.iter().map(|s| s.bundle.len()).sum()
    }

    pub fn bundle(&self, key: &str) -> Option<&SeriesBundle> {
        self.series
            .iter()
            .find(|s| s.key.as_str() == key)
            .map(|s| &s.bundle)
    }

    pub fn value_at(&self, point: PointRef) -> Option<f64> {
        self.get(point.series)?.bundle.values.get(point.index).copied()
    }

    pub fn subject_at(&self, point: PointRef) -> Option<&str> {
        self.get(point.series)?
            .bundle
            .subject_ids
            .get(point.index)
            .map(String::as_str)
    }

    pub fn session_name_at(&self, point: PointRef) -> Option<&str> {
        self.get(point.series)?
            .bundle
            .session_names
            .get(point.index)
            .map(String::as_str)
    }

    /// Apply `f` to every bundle, keeping keys and order.
    pub fn map_bundles(&self, mut f: impl FnMut(&GroupKey, &SeriesBundle) -> SeriesBundle) -> Self {
        Self {
            series: self
                .series
                .iter()
                .map(|s| Series {
                    key: s.key.clone(),
                    bundle: f(&s.key, &s.bundle),
                })
                .collect(),
        }
    }
}
