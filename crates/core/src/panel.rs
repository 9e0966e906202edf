//! Fetch lifecycle of one metrics panel: selection → request → response →
//! pivot → optional outlier removal → chart.
//!
//! The panel never performs I/O. [`MetricsPanel::request`] hands out a
//! [`PendingFetch`] ticket; the host runs the request and passes the outcome
//! back through [`MetricsPanel::resolve`]. Only one ticket is outstanding at
//! a time and responses carrying any other ticket id are dropped.

use qc_metrics_protocol::{MetricRecord, Point, PointRef, RenderCommand, Viewport};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::DashboardConfig;
use crate::model::{GroupBy, pivot};
use crate::navigation::NavTarget;
use crate::parsers::{ParseError, parse_metric_response};
use crate::query::{QueryParams, Selection, build_query};
use crate::stats::{OutlierFilter, OutlierReport};
use crate::views::{ChartOptions, MetricChart, Tooltip, render_banners, render_message};

pub const NO_DATA_MESSAGE: &str =
    "No data for these settings. Try a different metric type or scan type.";
pub const LOADING_MESSAGE: &str = "Loading chart...";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotMode {
    #[default]
    All,
    WithoutOutliers,
}

/// An issued request the host must run and report back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingFetch {
    pub id: u64,
    pub params: QueryParams,
    pub mode: PlotMode,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Network(String),
    #[error("server answered with HTTP {0}")]
    Status(u16),
    #[error("unreadable response: {0}")]
    Parse(#[from] ParseError),
}

#[derive(Debug, Error, PartialEq)]
pub enum PanelError {
    #[error("outlier threshold must be a positive number, got {0}")]
    InvalidThreshold(f64),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum PanelStatus {
    #[default]
    Idle,
    Loading,
    /// The query matched no records.
    NoData,
    Ready,
    /// The last fetch failed; the previous chart, if any, stays up.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct MetricsPanel {
    group_by: GroupBy,
    filter: OutlierFilter,
    chart_options: ChartOptions,
    next_id: u64,
    pending: Option<PendingFetch>,
    status: PanelStatus,
    chart: Option<MetricChart>,
    mode: PlotMode,
    reports: Vec<OutlierReport>,
    outlier_control: bool,
}

impl Default for MetricsPanel {
    fn default() -> Self {
        Self::new(GroupBy::default(), OutlierFilter::default())
    }
}

impl MetricsPanel {
    pub fn new(group_by: GroupBy, filter: OutlierFilter) -> Self {
        Self {
            group_by,
            filter,
            chart_options: ChartOptions::default(),
            next_id: 1,
            pending: None,
            status: PanelStatus::Idle,
            chart: None,
            mode: PlotMode::All,
            reports: Vec::new(),
            outlier_control: false,
        }
    }

    /// Panel using the configured grouping and threshold. The config is
    /// expected to be validated; an invalid threshold falls back to the
    /// default.
    pub fn from_config(config: &DashboardConfig) -> Self {
        let filter = OutlierFilter::new(config.chart.outlier_threshold).unwrap_or_default();
        Self::new(config.chart.group_by, filter)
    }

    pub fn with_chart_options(mut self, options: ChartOptions) -> Self {
        self.chart_options = options;
        self
    }

    pub fn set_outlier_threshold(&mut self, threshold: f64) -> Result<(), PanelError> {
        self.filter = OutlierFilter::new(threshold).ok_or(PanelError::InvalidThreshold(threshold))?;
        Ok(())
    }

    pub fn outlier_threshold(&self) -> f64 {
        self.filter.threshold()
    }

    pub fn group_by(&self) -> GroupBy {
        self.group_by
    }

    /// Start a fetch for `selection`.
    ///
    /// Returns `None`, leaving everything as it was, when the selection is
    /// incomplete or another fetch is still outstanding.
    pub fn request(&mut self, selection: &Selection, mode: PlotMode) -> Option<PendingFetch> {
        let params = build_query(selection)?;
        if let Some(pending) = &self.pending {
            tracing::debug!(pending = pending.id, "fetch already in flight, ignoring request");
            return None;
        }

        let ticket = PendingFetch {
            id: self.next_id,
            params,
            mode,
        };
        self.next_id += 1;
        self.pending = Some(ticket.clone());
        self.status = PanelStatus::Loading;
        Some(ticket)
    }

    /// Re-fetch the current selection with outliers removed.
    pub fn remove_outliers(&mut self, selection: &Selection) -> Option<PendingFetch> {
        self.request(selection, PlotMode::WithoutOutliers)
    }

    /// Apply the outcome of fetch `id`. Returns `false` when the response
    /// belongs to no outstanding ticket and was dropped.
    pub fn resolve(&mut self, id: u64, outcome: Result<Vec<MetricRecord>, FetchError>) -> bool {
        let Some(ticket) = self.pending.take_if(|p| p.id == id) else {
            tracing::warn!(id, "dropping response for a stale or unknown request");
            return false;
        };

        match outcome {
            Err(err) => {
                tracing::warn!(id, error = %err, "metric fetch failed");
                self.status = PanelStatus::Failed(err.to_string());
            }
            Ok(records) => self.show(&records, ticket.mode),
        }
        true
    }

    /// Plot records already at hand, bypassing the fetch cycle. An empty
    /// slice, or one with nothing left to plot once missing values and
    /// outliers are dropped, shows the no-data message.
    pub fn show(&mut self, records: &[MetricRecord], mode: PlotMode) {
        self.reports.clear();
        if records.is_empty() {
            self.chart = None;
            self.outlier_control = false;
            self.status = PanelStatus::NoData;
            return;
        }

        let mut pivoted = pivot(records, self.group_by);
        if mode == PlotMode::WithoutOutliers {
            let (filtered, reports) = self.filter.filter_pivot(&pivoted);
            pivoted = filtered;
            self.reports = reports;
        }
        self.mode = mode;
        // the control stays so a filtered-away plot can be switched back
        self.outlier_control = true;

        let plotted = pivoted
            .series()
            .iter()
            .flat_map(|s| &s.bundle.values)
            .filter(|v| v.is_finite())
            .count();
        if plotted == 0 {
            tracing::debug!(records = records.len(), ?mode, "nothing left to plot");
            self.chart = None;
            self.status = PanelStatus::NoData;
            return;
        }
        self.chart = Some(MetricChart::with_options(pivoted, self.chart_options.clone()));
        self.status = PanelStatus::Ready;
    }

    /// Abandon fetch `id`, e.g. after the host dropped the request. The
    /// panel returns to what it showed before. Returns `false` when `id` is
    /// not the outstanding ticket.
    pub fn cancel(&mut self, id: u64) -> bool {
        if self.pending.take_if(|p| p.id == id).is_none() {
            return false;
        }
        tracing::debug!(id, "fetch cancelled");
        self.status = if self.chart.is_some() {
            PanelStatus::Ready
        } else {
            PanelStatus::Idle
        };
        true
    }

    /// Like [`resolve`](Self::resolve) for a raw response body.
    pub fn resolve_body(&mut self, id: u64, body: &[u8]) -> bool {
        let outcome =
            parse_metric_response(body).map_err(|e| FetchError::Parse(ParseError::from(e)));
        self.resolve(id, outcome)
    }

    pub fn status(&self) -> &PanelStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingFetch> {
        self.pending.as_ref()
    }

    pub fn chart(&self) -> Option<&MetricChart> {
        self.chart.as_ref()
    }

    /// Mode of the chart currently shown.
    pub fn plot_mode(&self) -> PlotMode {
        self.mode
    }

    /// Per-group outlier summaries of the last filtered plot.
    pub fn reports(&self) -> &[OutlierReport] {
        &self.reports
    }

    /// The "remove outliers" control appears once a chart has been drawn.
    pub fn outlier_control_visible(&self) -> bool {
        self.outlier_control
    }

    pub fn render(&self, viewport: &Viewport) -> Vec<RenderCommand> {
        match &self.status {
            PanelStatus::Idle => Vec::new(),
            PanelStatus::Loading => render_message(LOADING_MESSAGE, viewport),
            PanelStatus::NoData => render_message(NO_DATA_MESSAGE, viewport),
            PanelStatus::Ready => self.render_chart(viewport),
            PanelStatus::Failed(message) => {
                let mut commands = self.render_chart(viewport);
                commands.extend(render_banners(&[message.as_str()], viewport));
                commands
            }
        }
    }

    fn render_chart(&self, viewport: &Viewport) -> Vec<RenderCommand> {
        self.chart
            .as_ref()
            .map(|chart| chart.render(viewport))
            .unwrap_or_default()
    }

    /// Session page behind the point under `pointer`.
    pub fn click(&self, viewport: &Viewport, pointer: Point) -> Option<NavTarget> {
        self.chart.as_ref()?.click(viewport, pointer)
    }

    pub fn hit_test(&self, viewport: &Viewport, pointer: Point) -> Option<PointRef> {
        self.chart.as_ref()?.hit_test(viewport, pointer)
    }

    pub fn tooltip(&self, point: PointRef) -> Option<Tooltip> {
        self.chart.as_ref()?.tooltip(point)
    }

    pub fn render_hover(&self, viewport: &Viewport, point: PointRef) -> Vec<RenderCommand> {
        self.chart
            .as_ref()
            .map(|chart| chart.render_hover(viewport, point))
            .unwrap_or_default()
    }
}
