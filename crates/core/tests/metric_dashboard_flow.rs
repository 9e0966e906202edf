//! Integration test: run a saved metric endpoint reply through the full
//! panel flow and check grouping, outlier removal, drill-through, tooltips
//! and exports.

use qc_metrics_core::export::Table;
use qc_metrics_core::model::{GroupBy, pivot};
use qc_metrics_core::navigation::NavTarget;
use qc_metrics_core::panel::{MetricsPanel, PanelStatus, PlotMode};
use qc_metrics_core::parsers::parse_metric_response;
use qc_metrics_core::query::Selection;
use qc_metrics_core::stats::OutlierFilter;
use qc_metrics_core::svg::render_svg;
use qc_metrics_protocol::{PointRef, RenderCommand, Viewport};

const SAMPLE: &[u8] = include_bytes!("fixtures/metric-response-sample.json");

fn selection() -> Selection {
    Selection::new("SPINS", "False")
        .with_site("CMH")
        .with_site("ZHH")
        .with_scan_type("T1")
        .with_metric_type("snr")
}

#[test]
fn sample_groups_by_site_and_scan_description() {
    let records = parse_metric_response(SAMPLE).expect("sample should parse");
    assert_eq!(records.len(), 11);

    let pivoted = pivot(&records, GroupBy::SiteScanType);
    let keys: Vec<&str> = pivoted.series().iter().map(|s| s.key.as_str()).collect();
    // null scan_description still yields a usable key
    assert_eq!(keys, vec!["CMH:SagT1", "ZHH:T1w", "ZHH:"]);
    assert_eq!(pivoted.max_len(), Some(9));
    assert_eq!(pivoted.record_count(), records.len());

    let by_site = pivot(&records, GroupBy::Site);
    assert_eq!(by_site.len(), 2);
    assert_eq!(by_site.bundle("ZHH").map(|b| b.len()), Some(2));
}

#[test]
fn outlier_pass_drops_low_snr_scan_only() {
    let records = parse_metric_response(SAMPLE).unwrap();
    let (filtered, reports) = OutlierFilter::default().filter_pivot(&pivot(&records, GroupBy::SiteScanType));

    let cmh = filtered.bundle("CMH:SagT1").unwrap();
    assert_eq!(cmh.len(), 8);
    assert!(!cmh.subject_ids.iter().any(|id| id == "1209"));

    // single-scan groups have zero spread and are kept
    assert_eq!(filtered.bundle("ZHH:T1w").unwrap().len(), 1);
    assert_eq!(filtered.bundle("ZHH:").unwrap().len(), 1);
    assert_eq!(reports.iter().map(|r| r.rejected).sum::<usize>(), 1);
}

#[test]
fn panel_flow_from_request_to_click() {
    let mut panel = MetricsPanel::default();
    let ticket = panel.request(&selection(), PlotMode::All).unwrap();
    assert_eq!(ticket.params.sites, "CMH,ZHH");
    assert!(panel.resolve_body(ticket.id, SAMPLE));
    assert_eq!(panel.status(), &PanelStatus::Ready);

    let viewport = Viewport::new(960.0, 420.0);
    let commands = panel.render(&viewport);
    let markers = commands
        .iter()
        .filter(|c| matches!(c, RenderCommand::DrawCircle { point: Some(_), .. }))
        .count();
    assert_eq!(markers, 11);

    // ZHH:T1w is the second series; its only point is session 1301
    let chart = panel.chart().unwrap();
    let point = PointRef::new(1, 0);
    let position = chart.point_position(&viewport, point).unwrap();
    assert_eq!(
        panel.click(&viewport, position),
        Some(NavTarget::Session("1301".to_string()))
    );

    let tooltip = panel.tooltip(point).unwrap();
    assert_eq!(tooltip.title, "SPN01_ZHH_0001_01");
    assert_eq!(tooltip.value, "44.01");

    let svg = render_svg(&commands, viewport.width, viewport.height, false);
    assert!(svg.contains("CMH:SagT1"));
    assert_eq!(svg.matches("<circle").count(), 11);
}

#[test]
fn remove_outliers_refetches_and_filters() {
    let mut panel = MetricsPanel::default();
    let first = panel.request(&selection(), PlotMode::All).unwrap();
    panel.resolve_body(first.id, SAMPLE);
    assert!(panel.outlier_control_visible());

    let second = panel.remove_outliers(&selection()).unwrap();
    panel.resolve_body(second.id, SAMPLE);
    assert_eq!(panel.chart().unwrap().pivot().record_count(), 10);
    assert_eq!(panel.plot_mode(), PlotMode::WithoutOutliers);
}

#[test]
fn chart_export_lists_every_point() {
    let records = parse_metric_response(SAMPLE).unwrap();
    let csv = Table::from_pivot(&pivot(&records, GroupBy::SiteScanType)).to_csv();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 12);
    assert_eq!(lines[1], "CMH:SagT1,0,1201,SPN01_CMH_0001_01,41.73");
    assert!(lines.contains(&"ZHH:,0,1302,SPN01_ZHH_0002_01,43.5"));
}
