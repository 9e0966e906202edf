//! Browser bindings. State lives in exported objects owned by the page
//! script, one [`MetricsDashboard`] per metrics panel and one [`QcReviews`]
//! per session page.

use qc_metrics_core::config::DashboardConfig;
use qc_metrics_core::export::Table;
use qc_metrics_core::navigation::find_session;
use qc_metrics_core::panel::{
    FetchError, LOADING_MESSAGE, MetricsPanel, NO_DATA_MESSAGE, PanelStatus, PlotMode,
};
use qc_metrics_core::parsers::parse_qc_search;
use qc_metrics_core::query::{Selection, build_query};
use qc_metrics_core::review::{ReviewAction, ReviewBoard, ReviewResponse};
use qc_metrics_core::svg::render_svg;
use qc_metrics_core::views::format_metric_value;
use qc_metrics_protocol::{Point, Viewport};
use serde::Serialize;
use wasm_bindgen::prelude::*;

fn js_err(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

fn parse_selection(selection_json: &str) -> Result<Selection, JsError> {
    serde_json::from_str(selection_json).map_err(js_err)
}

/// Fetch the page script must perform.
#[derive(Serialize)]
struct FetchTicket<'a> {
    id: u64,
    url: String,
    mode: PlotMode,
    params: &'a qc_metrics_core::query::QueryParams,
}

#[wasm_bindgen]
pub struct MetricsDashboard {
    config: DashboardConfig,
    panel: MetricsPanel,
}

#[wasm_bindgen]
impl MetricsDashboard {
    /// Create a panel from an optional TOML config.
    #[wasm_bindgen(constructor)]
    pub fn new(config_toml: Option<String>) -> Result<MetricsDashboard, JsError> {
        let config = match config_toml {
            Some(text) => DashboardConfig::from_toml_str(&text).map_err(js_err)?,
            None => DashboardConfig::default(),
        };
        config.validate().map_err(js_err)?;
        Ok(Self {
            panel: MetricsPanel::from_config(&config),
            config,
        })
    }

    /// Start a fetch for the selection (JSON). Returns the ticket as JSON, or
    /// `undefined` when the selection is incomplete or a fetch is running.
    pub fn request(
        &mut self,
        selection_json: &str,
        without_outliers: bool,
    ) -> Result<Option<String>, JsError> {
        let selection = parse_selection(selection_json)?;
        let mode = if without_outliers {
            PlotMode::WithoutOutliers
        } else {
            PlotMode::All
        };
        let Some(ticket) = self.panel.request(&selection, mode) else {
            return Ok(None);
        };
        let out = FetchTicket {
            id: ticket.id,
            url: self.config.metric_url(&ticket.params),
            mode: ticket.mode,
            params: &ticket.params,
        };
        serde_json::to_string(&out).map(Some).map_err(js_err)
    }

    /// Hand over a response body. Returns `false` for a stale ticket.
    pub fn resolve(&mut self, id: u64, body: &[u8]) -> bool {
        self.panel.resolve_body(id, body)
    }

    /// Report a failed fetch. `status` is the HTTP status, 0 for network errors.
    pub fn fail(&mut self, id: u64, status: u16, message: &str) -> bool {
        let err = if status == 0 {
            FetchError::Network(message.to_string())
        } else {
            FetchError::Status(status)
        };
        self.panel.resolve(id, Err(err))
    }

    /// Abandon a fetch the page dropped. Returns `false` for a stale ticket.
    pub fn cancel(&mut self, id: u64) -> bool {
        self.panel.cancel(id)
    }

    pub fn status(&self) -> String {
        match self.panel.status() {
            PanelStatus::Idle => "idle",
            PanelStatus::Loading => "loading",
            PanelStatus::NoData => "no-data",
            PanelStatus::Ready => "ready",
            PanelStatus::Failed(_) => "failed",
        }
        .to_string()
    }

    /// Text of the message or banner the panel currently shows, if any.
    pub fn status_message(&self) -> Option<String> {
        match self.panel.status() {
            PanelStatus::Idle | PanelStatus::Ready => None,
            PanelStatus::Loading => Some(LOADING_MESSAGE.to_string()),
            PanelStatus::NoData => Some(NO_DATA_MESSAGE.to_string()),
            PanelStatus::Failed(message) => Some(message.clone()),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.panel.is_loading()
    }

    pub fn outlier_control_visible(&self) -> bool {
        self.panel.outlier_control_visible()
    }

    pub fn set_outlier_threshold(&mut self, threshold: f64) -> Result<(), JsError> {
        self.panel.set_outlier_threshold(threshold).map_err(js_err)
    }

    /// Render commands for the panel, as JSON.
    pub fn render(&self, width: f64, height: f64, dpr: f64) -> Result<String, JsError> {
        let viewport = Viewport {
            dpr,
            ..Viewport::new(width, height)
        };
        serde_json::to_string(&self.panel.render(&viewport)).map_err(js_err)
    }

    pub fn render_svg(&self, width: f64, height: f64) -> String {
        let commands = self.panel.render(&Viewport::new(width, height));
        render_svg(&commands, width, height, self.config.chart.dark)
    }

    /// Hover overlay (highlight and tooltip box) as JSON, empty when the
    /// pointer is over no point.
    pub fn render_hover(&self, x: f64, y: f64, width: f64, height: f64) -> Result<String, JsError> {
        let viewport = Viewport::new(width, height);
        let commands = self
            .panel
            .hit_test(&viewport, Point::new(x, y))
            .map(|point| self.panel.render_hover(&viewport, point))
            .unwrap_or_default();
        serde_json::to_string(&commands).map_err(js_err)
    }

    /// Page to open for a click at `(x, y)`.
    pub fn click_url(&self, x: f64, y: f64, width: f64, height: f64) -> Option<String> {
        self.panel
            .click(&Viewport::new(width, height), Point::new(x, y))
            .map(|target| target.path())
    }

    pub fn tooltip_html(&self, x: f64, y: f64, width: f64, height: f64) -> Option<String> {
        let viewport = Viewport::new(width, height);
        let point = self.panel.hit_test(&viewport, Point::new(x, y))?;
        self.panel.tooltip(point).map(|t| t.to_html())
    }

    /// CSV of the plotted points.
    pub fn export_csv(&self) -> Option<String> {
        self.panel
            .chart()
            .map(|chart| Table::from_pivot(chart.pivot()).to_csv())
    }
}

#[wasm_bindgen]
#[derive(Default)]
pub struct QcReviews {
    board: ReviewBoard,
}

#[wasm_bindgen]
impl QcReviews {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a review update. `action` is `approve`, `flag`, `blacklist`,
    /// `delete` or `update` (edit the comment). Returns the JSON body to post.
    pub fn submit(
        &mut self,
        scan: u64,
        action: &str,
        comment: Option<String>,
    ) -> Result<String, JsError> {
        let action: ReviewAction =
            serde_json::from_value(serde_json::Value::String(action.to_string())).map_err(js_err)?;
        let request = self.board.submit(scan, action, comment).map_err(js_err)?;
        serde_json::to_string(&request).map_err(js_err)
    }

    pub fn succeed(&mut self, scan: u64, response_json: &str) -> Result<(), JsError> {
        let response: ReviewResponse = serde_json::from_str(response_json).map_err(js_err)?;
        self.board
            .complete::<String>(scan, Ok(response))
            .map_err(js_err)
    }

    pub fn fail(&mut self, scan: u64, message: &str) -> Result<(), JsError> {
        self.board
            .complete(scan, Err::<ReviewResponse, _>(message))
            .map_err(js_err)
    }

    /// Review state of one scan as JSON, `undefined` for unknown scans.
    pub fn scan(&self, scan: u64) -> Result<Option<String>, JsError> {
        self.board
            .scan(scan)
            .map(|s| serde_json::to_string(s).map_err(js_err))
            .transpose()
    }

    /// `[[scan, message], ...]` for scans whose update failed.
    pub fn banners(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.board.banners()).map_err(js_err)
    }

    pub fn toggle_comments(&mut self, scan: u64) -> bool {
        self.board.toggle_comments(scan)
    }
}

/// URL-encoded query for a selection, `undefined` when incomplete.
#[wasm_bindgen]
pub fn build_query_string(selection_json: &str) -> Result<Option<String>, JsError> {
    let selection = parse_selection(selection_json)?;
    Ok(build_query(&selection).map(|params| params.to_query_string()))
}

/// CSV of table rows given as a JSON array of string arrays.
#[wasm_bindgen]
pub fn export_csv(rows_json: &str) -> Result<String, JsError> {
    let rows: Vec<Vec<String>> = serde_json::from_str(rows_json).map_err(js_err)?;
    Ok(Table::from_rows(rows).to_csv())
}

/// CSV of a QC search reply.
#[wasm_bindgen]
pub fn search_results_csv(body: &[u8]) -> Result<String, JsError> {
    let rows = parse_qc_search(body).map_err(js_err)?;
    Ok(Table::from_search_records(&rows).to_csv())
}

#[wasm_bindgen]
pub fn format_value(value: f64) -> String {
    format_metric_value(value)
}

/// Path of the navbar session search, `undefined` for blank input.
#[wasm_bindgen]
pub fn find_session_path(search_text: &str) -> Option<String> {
    find_session(search_text).map(|target| target.path())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SELECTION: &str = r#"{"study":"SPINS","phantom":"False","sites":["CMH"],
        "scan_types":["T1"],"metric_type":"snr","scan_class":null}"#;

    #[test]
    fn request_resolve_render() {
        let mut dash = MetricsDashboard::new(None).unwrap();
        let ticket = dash.request(SELECTION, false).unwrap().unwrap();
        let ticket: serde_json::Value = serde_json::from_str(&ticket).unwrap();
        assert!(
            ticket["url"]
                .as_str()
                .unwrap()
                .starts_with("http://localhost:5000/metricDataAsJson?studies=SPINS")
        );
        assert!(dash.is_loading());
        // no overlapping fetch
        assert_eq!(dash.request(SELECTION, false).unwrap(), None);

        let id = ticket["id"].as_u64().unwrap();
        let body = br#"{"data":[{"site_name":"CMH","scan_description":"T1","session_id":9,
                       "session_name":"a","value":1.0}]}"#;
        assert!(dash.resolve(id, body));
        assert_eq!(dash.status(), "ready");
        assert!(dash.render_svg(600.0, 300.0).contains("<circle"));
        assert_eq!(
            dash.export_csv().unwrap(),
            "group,index,session_id,session_name,value\nCMH:T1,0,9,a,1"
        );
    }

    #[test]
    fn failure_marks_panel_failed() {
        let mut dash = MetricsDashboard::new(None).unwrap();
        let ticket: serde_json::Value =
            serde_json::from_str(&dash.request(SELECTION, false).unwrap().unwrap()).unwrap();
        assert!(dash.fail(ticket["id"].as_u64().unwrap(), 502, "bad gateway"));
        assert_eq!(dash.status(), "failed");
        assert_eq!(
            dash.status_message().as_deref(),
            Some("server answered with HTTP 502")
        );
        assert!(!dash.is_loading());
    }

    #[test]
    fn cancelled_fetch_frees_the_panel() {
        let mut dash = MetricsDashboard::new(None).unwrap();
        assert_eq!(dash.status_message(), None);
        let ticket: serde_json::Value =
            serde_json::from_str(&dash.request(SELECTION, false).unwrap().unwrap()).unwrap();
        assert_eq!(dash.status_message().as_deref(), Some(LOADING_MESSAGE));
        assert!(dash.cancel(ticket["id"].as_u64().unwrap()));
        assert_eq!(dash.status(), "idle");
        assert!(dash.request(SELECTION, false).unwrap().is_some());
    }

    #[test]
    fn reviews_round_trip() {
        let mut reviews = QcReviews::new();
        let body = reviews.submit(4, "approve", None).unwrap();
        assert_eq!(body, r#"{"scan":4,"approve":true}"#);
        reviews.fail(4, "HTTP 500").unwrap();
        assert_eq!(
            reviews.banners().unwrap(),
            r#"[[4,"Update failed, please contact an admin."]]"#
        );
    }

    #[test]
    fn comment_update_keeps_badge() {
        let mut reviews = QcReviews::new();
        reviews.submit(8, "flag", Some("ghosting".into())).unwrap();
        reviews
            .succeed(8, r#"{"user":"kim","timestamp":"2024-03-02 09:30"}"#)
            .unwrap();
        let body = reviews.submit(8, "update", Some("mild ghosting".into())).unwrap();
        assert_eq!(body, r#"{"scan":8,"comment":"mild ghosting","update":true}"#);
        reviews
            .succeed(8, r#"{"user":"lee","timestamp":"2024-03-03 11:00"}"#)
            .unwrap();
        let scan: serde_json::Value =
            serde_json::from_str(&reviews.scan(8).unwrap().unwrap()).unwrap();
        assert_eq!(scan["badge"], "flagged");
        assert_eq!(scan["comment"], "mild ghosting");
        assert_eq!(scan["signature"], "lee at 2024-03-03 11:00");
    }

    #[test]
    fn free_functions() {
        assert_eq!(format_value(12.005), "12.01");
        assert_eq!(find_session_path("  "), None);
        assert_eq!(export_csv(r#"[["a","b"],["c","d"]]"#).unwrap(), "a,b\nc,d");
        assert_eq!(
            build_query_string(r#"{"study":"SPINS"}"#).unwrap(),
            None
        );
    }
}
