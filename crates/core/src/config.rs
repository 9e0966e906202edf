//! Dashboard configuration, read from TOML.
//!
//! Resolution order (highest priority first):
//! 1. explicit overrides (CLI flags)
//! 2. `QC_METRICS_BASE_URL` environment variable
//! 3. the config file
//! 4. compiled defaults

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::GroupBy;
use crate::query::QueryParams;
use crate::stats::outlier::DEFAULT_THRESHOLD;

pub const BASE_URL_ENV: &str = "QC_METRICS_BASE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("{field}: {message}")]
    Invalid { field: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Scheme, host and port of the dashboard server.
    pub base_url: String,
    /// Path of the metric data endpoint.
    pub endpoint: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            endpoint: "/metricDataAsJson".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub width: f64,
    pub height: f64,
    pub dark: bool,
    pub group_by: GroupBy,
    /// Standard deviations kept when outliers are removed.
    pub outlier_threshold: f64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 420.0,
            dark: false,
            group_by: GroupBy::default(),
            outlier_threshold: DEFAULT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub server: ServerConfig,
    pub chart: ChartConfig,
}

/// Values given on the command line; `None` keeps the configured value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub group_by: Option<GroupBy>,
    pub outlier_threshold: Option<f64>,
    pub dark: Option<bool>,
}

impl DashboardConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load and validate, applying the environment and `overrides` on top of
    /// the file. A missing `path` means defaults only.
    pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };

        if let Ok(url) = std::env::var(BASE_URL_ENV)
            && !url.trim().is_empty()
        {
            config.server.base_url = url;
        }
        config.apply_overrides(overrides);
        config.validate()?;

        tracing::debug!(
            base_url = %config.server.base_url,
            group_by = ?config.chart.group_by,
            threshold = config.chart.outlier_threshold,
            "loaded dashboard config"
        );
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(url) = &overrides.base_url {
            self.server.base_url = url.clone();
        }
        if let Some(group_by) = overrides.group_by {
            self.chart.group_by = group_by;
        }
        if let Some(threshold) = overrides.outlier_threshold {
            self.chart.outlier_threshold = threshold;
        }
        if let Some(dark) = overrides.dark {
            self.chart.dark = dark;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.chart.outlier_threshold;
        if !(threshold.is_finite() && threshold > 0.0) {
            return Err(ConfigError::Invalid {
                field: "chart.outlier_threshold",
                message: format!("must be a positive number, got {threshold}"),
            });
        }
        if !(self.chart.width > 0.0 && self.chart.height > 0.0) {
            return Err(ConfigError::Invalid {
                field: "chart.width/height",
                message: "chart dimensions must be positive".to_string(),
            });
        }
        match url::Url::parse(&self.server.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(ConfigError::Invalid {
                    field: "server.base_url",
                    message: format!("unsupported scheme `{}`", url.scheme()),
                });
            }
            Err(e) => {
                return Err(ConfigError::Invalid {
                    field: "server.base_url",
                    message: e.to_string(),
                });
            }
        }
        if !self.server.endpoint.starts_with('/') {
            return Err(ConfigError::Invalid {
                field: "server.endpoint",
                message: format!("must start with `/`, got `{}`", self.server.endpoint),
            });
        }
        Ok(())
    }

    /// Endpoint URL without a query string.
    pub fn endpoint_url(&self) -> String {
        format!(
            "{}{}",
            self.server.base_url.trim_end_matches('/'),
            self.server.endpoint
        )
    }

    /// Full request URL for `params`.
    pub fn metric_url(&self, params: &QueryParams) -> String {
        format!("{}?{}", self.endpoint_url(), params.to_query_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Selection, build_query};

    #[test]
    fn empty_file_gives_defaults() {
        let config = DashboardConfig::from_toml_str("").unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.chart.outlier_threshold, 2.0);
        assert_eq!(config.server.endpoint, "/metricDataAsJson");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = DashboardConfig::from_toml_str(
            r#"
            [server]
            base_url = "https://qc.example.org/"

            [chart]
            group_by = "site"
            dark = true
            "#,
        )
        .unwrap();
        assert_eq!(config.chart.group_by, GroupBy::Site);
        assert!(config.chart.dark);
        assert_eq!(config.chart.width, 960.0);
        assert_eq!(config.endpoint_url(), "https://qc.example.org/metricDataAsJson");
    }

    #[test]
    fn rejects_bad_threshold() {
        let config =
            DashboardConfig::from_toml_str("[chart]\noutlier_threshold = -1.0\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "chart.outlier_threshold",
                ..
            })
        ));
    }

    #[test]
    fn rejects_bad_base_url() {
        let mut config = DashboardConfig::default();
        config.server.base_url = "dashboard:5000/".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "server.base_url",
                ..
            })
        ));
        config.server.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            DashboardConfig::from_toml_str("[chart\nwidth = 3"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn overrides_win() {
        let mut config = DashboardConfig::default();
        config.apply_overrides(&ConfigOverrides {
            outlier_threshold: Some(3.0),
            group_by: Some(GroupBy::Site),
            ..ConfigOverrides::default()
        });
        assert_eq!(config.chart.outlier_threshold, 3.0);
        assert_eq!(config.chart.group_by, GroupBy::Site);
    }

    #[test]
    fn metric_url_appends_query() {
        let params = build_query(
            &Selection::new("SPINS", "True")
                .with_site("CMH")
                .with_scan_type("T1")
                .with_metric_type("snr"),
        )
        .unwrap();
        let url = DashboardConfig::default().metric_url(&params);
        assert!(url.starts_with("http://localhost:5000/metricDataAsJson?studies=SPINS&"));
        assert!(url.ends_with("&byname=1"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = DashboardConfig::load(
            Some(Path::new("/nonexistent/qc-metrics.toml")),
            &ConfigOverrides::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
