//! Standard-deviation based outlier removal, applied per chart series.

use serde::{Deserialize, Serialize};

use crate::model::{GroupKey, PivotResult, SeriesBundle};

/// Default number of standard deviations from the mean that a value may lie
/// before it is dropped from a plot.
pub const DEFAULT_THRESHOLD: f64 = 2.0;

/// Mean and population standard deviation of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
}

impl SeriesStats {
    /// Statistics over the finite values of a series. `None` when there are
    /// none.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let count = values.iter().filter(|v| v.is_finite()).count();
        if count == 0 {
            return None;
        }
        let n = count as f64;
        let finite = || values.iter().filter(|v| v.is_finite());
        let mean = finite().sum::<f64>() / n;
        let variance = finite()
            .map(|v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / n;
        Some(Self {
            count,
            mean,
            std_dev: variance.sqrt(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    Inlier,
    Outlier,
}

/// Outcome of filtering one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub key: GroupKey,
    pub total: usize,
    pub kept: usize,
    pub rejected: usize,
    pub stats: Option<SeriesStats>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierFilter {
    threshold: f64,
}

impl Default for OutlierFilter {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl OutlierFilter {
    /// Filter with a custom multiple of the standard deviation.
    /// Returns `None` unless `threshold` is finite and positive.
    pub fn new(threshold: f64) -> Option<Self> {
        (threshold.is_finite() && threshold > 0.0).then_some(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Inclusive `[low, high]` bounds of accepted values.
    pub fn bounds(&self, stats: &SeriesStats) -> (f64, f64) {
        let spread = stats.std_dev * self.threshold;
        (stats.mean - spread, stats.mean + spread)
    }

    /// Missing (non-finite) values are outliers: they cannot be plotted.
    pub fn classify(&self, values: &[f64]) -> Vec<Classification> {
        let Some(stats) = SeriesStats::from_values(values) else {
            return vec![Classification::Outlier; values.len()];
        };
        let (low, high) = self.bounds(&stats);
        values
            .iter()
            .map(|&v| {
                if v >= low && v <= high {
                    Classification::Inlier
                } else {
                    Classification::Outlier
                }
            })
            .collect()
    }

    /// Drop outliers from one series, keeping its sequences aligned.
    pub fn filter_bundle(&self, bundle: &SeriesBundle) -> SeriesBundle {
        if bundle.is_empty() {
            return bundle.clone();
        }
        let keep: Vec<bool> = self
            .classify(&bundle.values)
            .into_iter()
            .map(|c| c == Classification::Inlier)
            .collect();
        bundle.retain_by(&keep)
    }

    /// Drop outliers group by group. Statistics are never pooled across
    /// groups.
    pub fn filter_pivot(&self, pivot: &PivotResult) -> (PivotResult, Vec<OutlierReport>) {
        let mut reports = Vec::with_capacity(pivot.len());
        let filtered = pivot.map_bundles(|key, bundle| {
            let kept = self.filter_bundle(bundle);
            let report = OutlierReport {
                key: key.clone(),
                total: bundle.len(),
                kept: kept.len(),
                rejected: bundle.len() - kept.len(),
                stats: SeriesStats::from_values(&bundle.values),
            };
            if report.rejected > 0 {
                tracing::debug!(
                    group = %key,
                    total = report.total,
                    rejected = report.rejected,
                    threshold = self.threshold,
                    "dropped outliers"
                );
            }
            reports.push(report);
            kept
        });
        (filtered, reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GroupBy, pivot};
    use qc_metrics_protocol::MetricRecord;

    #[test]
    fn population_stats() {
        let stats = SeriesStats::from_values(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        assert_eq!(stats.count, 5);
        assert!((stats.mean - 22.0).abs() < 1e-12);
        assert!((stats.std_dev - 1522f64.sqrt()).abs() < 1e-12);
        // population variance: divisor n
        let expected = ((21.0f64.powi(2) + 20.0f64.powi(2) + 19.0f64.powi(2) + 18.0f64.powi(2)
            + 78.0f64.powi(2))
            / 5.0)
            .sqrt();
        assert!((stats.std_dev - expected).abs() < 1e-12);
    }

    #[test]
    fn drops_value_beyond_two_std_devs() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 100.0];
        let filter = OutlierFilter::default();
        let stats = SeriesStats::from_values(&values).unwrap();
        assert!((stats.mean - 14.5).abs() < 1e-12);
        assert!((stats.std_dev - 818.25f64.sqrt()).abs() < 1e-12);

        let classes = filter.classify(&values);
        assert_eq!(classes[9], Classification::Outlier);
        assert!(classes[..9].iter().all(|c| *c == Classification::Inlier));
    }

    #[test]
    fn five_point_series_against_threshold() {
        // mean 22, population std dev sqrt(1522) ~ 39.01, so the 2σ upper
        // bound (~100.03) still admits 100 while 1.5σ (~80.5) rejects it.
        let values = [1.0, 2.0, 3.0, 4.0, 100.0];
        let stats = SeriesStats::from_values(&values).unwrap();
        let (low, high) = OutlierFilter::default().bounds(&stats);
        assert!((low - (22.0 - 2.0 * 1522f64.sqrt())).abs() < 1e-9);
        assert!(high > 100.0);
        assert!(
            OutlierFilter::default()
                .classify(&values)
                .iter()
                .all(|c| *c == Classification::Inlier)
        );

        let tighter = OutlierFilter::new(1.5).unwrap();
        assert_eq!(tighter.classify(&values)[4], Classification::Outlier);
        assert_eq!(tighter.filter_bundle(&bundle_of(&values)).values, vec![1.0, 2.0, 3.0, 4.0]);
    }

    fn bundle_of(values: &[f64]) -> SeriesBundle {
        SeriesBundle {
            values: values.to_vec(),
            subject_ids: (0..values.len()).map(|i| i.to_string()).collect(),
            session_names: (0..values.len()).map(|i| format!("s{i}")).collect(),
        }
    }

    #[test]
    fn bounds_are_inclusive() {
        // mean 0, population std dev 1: values exactly at ±1σ stay with k = 1
        let filter = OutlierFilter::new(1.0).unwrap();
        assert_eq!(
            filter.classify(&[-1.0, 1.0]),
            vec![Classification::Inlier, Classification::Inlier]
        );
    }

    #[test]
    fn empty_series_passes_through() {
        let filter = OutlierFilter::default();
        assert!(filter.classify(&[]).is_empty());
        let empty = SeriesBundle::default();
        assert_eq!(filter.filter_bundle(&empty), empty);
        assert!(SeriesStats::from_values(&[]).is_none());
    }

    #[test]
    fn missing_values_are_left_out_and_dropped() {
        let values = [1.0, f64::NAN, 2.0, 3.0];
        let stats = SeriesStats::from_values(&values).unwrap();
        assert_eq!(stats.count, 3);
        assert!((stats.mean - 2.0).abs() < 1e-12);

        let filter = OutlierFilter::default();
        assert_eq!(
            filter.classify(&values),
            vec![
                Classification::Inlier,
                Classification::Outlier,
                Classification::Inlier,
                Classification::Inlier,
            ]
        );
        let kept = filter.filter_bundle(&bundle_of(&values));
        assert_eq!(kept.values, vec![1.0, 2.0, 3.0]);
        assert_eq!(kept.session_names, vec!["s0", "s2", "s3"]);

        assert!(SeriesStats::from_values(&[f64::NAN]).is_none());
        assert_eq!(filter.classify(&[f64::NAN]), vec![Classification::Outlier]);
    }

    #[test]
    fn rejects_invalid_thresholds() {
        assert!(OutlierFilter::new(0.0).is_none());
        assert!(OutlierFilter::new(-1.0).is_none());
        assert!(OutlierFilter::new(f64::NAN).is_none());
        assert_eq!(OutlierFilter::new(3.0).unwrap().threshold(), 3.0);
    }

    #[test]
    fn filters_each_group_independently() {
        // Site B alone would look like an outlier cluster if stats were pooled.
        let mut records = Vec::new();
        for (i, v) in [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 100.0].iter().enumerate() {
            records.push(MetricRecord::new("A", "T1", i.to_string(), format!("a{i}"), *v));
        }
        for (i, v) in [500.0, 501.0, 502.0].iter().enumerate() {
            records.push(MetricRecord::new("B", "T1", i.to_string(), format!("b{i}"), *v));
        }
        let pivoted = pivot(&records, GroupBy::SiteScanType);
        let (filtered, reports) = OutlierFilter::default().filter_pivot(&pivoted);

        let a = filtered.bundle("A:T1").unwrap();
        assert_eq!(a.len(), 9);
        assert!(!a.values.contains(&100.0));
        assert_eq!(a.session_names.last().map(String::as_str), Some("a8"));
        assert_eq!(filtered.bundle("B:T1").unwrap().values, vec![500.0, 501.0, 502.0]);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].rejected, 1);
        assert_eq!(reports[1].rejected, 0);
    }
}
