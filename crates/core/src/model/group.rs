use std::fmt;
use std::str::FromStr;

use qc_metrics_protocol::MetricRecord;
use serde::{Deserialize, Serialize};

/// Granularity used to split metric records into chart series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupBy {
    /// One series per acquisition site.
    Site,
    /// One series per site and scan description, keyed `site:scan`.
    #[default]
    SiteScanType,
}

impl GroupBy {
    pub fn key_for(self, record: &MetricRecord) -> GroupKey {
        match self {
            GroupBy::Site => GroupKey(record.site_name.clone()),
            GroupBy::SiteScanType => GroupKey(format!(
                "{}:{}",
                record.site_name, record.scan_description
            )),
        }
    }
}

impl FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "site" => Ok(GroupBy::Site),
            "site-scan-type" | "site-scantype" => Ok(GroupBy::SiteScanType),
            other => Err(format!(
                "unknown grouping '{other}' (expected 'site' or 'site-scan-type')"
            )),
        }
    }
}

/// Name of one chart series, derived from a record by a [`GroupBy`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey(String);

impl GroupKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for GroupKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
