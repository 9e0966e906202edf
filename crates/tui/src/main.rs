mod fetch;
mod renderer;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use qc_metrics_core::config::{ConfigOverrides, DashboardConfig};
use qc_metrics_core::export::Table;
use qc_metrics_core::model::GroupBy;
use qc_metrics_core::panel::{MetricsPanel, PanelStatus, PlotMode};
use qc_metrics_core::parsers::parse_metric_response;
use qc_metrics_core::query::Selection;
use qc_metrics_core::svg::render_svg;
use qc_metrics_protocol::Viewport;
use tracing_subscriber::EnvFilter;

use crate::fetch::Source;

/// Plot QC metrics per site and scan type, in the terminal or as SVG/CSV.
#[derive(Parser, Debug)]
#[command(name = "qc-metrics", version)]
struct Args {
    /// Saved reply of the metric data endpoint. Without it, data is fetched
    /// from the dashboard server.
    #[arg(long, conflicts_with = "server")]
    file: Option<PathBuf>,

    /// Dashboard base URL, e.g. http://dashboard:5000
    #[arg(long)]
    server: Option<String>,

    /// TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    study: Option<String>,

    #[arg(long, default_value = "False")]
    phantom: String,

    /// Site to include; repeat for several.
    #[arg(long = "site")]
    sites: Vec<String>,

    /// Scan type to include; repeat for several.
    #[arg(long = "scan-type")]
    scan_types: Vec<String>,

    #[arg(long)]
    metric_type: Option<String>,

    /// `site` or `site-scan-type`.
    #[arg(long)]
    group_by: Option<GroupBy>,

    /// Standard deviations kept when outliers are removed.
    #[arg(long)]
    threshold: Option<f64>,

    /// Start with outliers removed.
    #[arg(long)]
    no_outliers: bool,

    #[arg(long)]
    dark: bool,

    /// Write the chart as SVG and exit.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Write the plotted points as CSV and exit.
    #[arg(long)]
    csv: Option<PathBuf>,
}

impl Args {
    fn selection(&self) -> Selection {
        Selection {
            study: self.study.clone(),
            phantom: Some(self.phantom.clone()),
            sites: self.sites.clone(),
            scan_types: self.scan_types.clone(),
            metric_type: self.metric_type.clone(),
            scan_class: None,
        }
    }

    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            base_url: self.server.clone(),
            group_by: self.group_by,
            outlier_threshold: self.threshold,
            dark: self.dark.then_some(true),
        }
    }

    fn mode(&self) -> PlotMode {
        if self.no_outliers {
            PlotMode::WithoutOutliers
        } else {
            PlotMode::All
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = DashboardConfig::load(args.config.as_deref(), &args.overrides())
        .context("failed to load configuration")?;

    let source = match &args.file {
        Some(path) => {
            let data =
                std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
            let records = parse_metric_response(&data)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            tracing::info!(records = records.len(), path = %path.display(), "loaded metric file");
            Source::File(records)
        }
        None => Source::server(config.clone(), args.selection())?,
    };

    let mut panel = MetricsPanel::from_config(&config);
    if !source.load(&mut panel, args.mode()) {
        bail!("incomplete selection: --study, --site, --scan-type and --metric-type are required");
    }

    if args.svg.is_some() || args.csv.is_some() {
        return export(&panel, &config, &args);
    }

    renderer::run(&mut panel, &config, |panel, mode| source.load(panel, mode))
}

fn export(panel: &MetricsPanel, config: &DashboardConfig, args: &Args) -> Result<()> {
    if let PanelStatus::Failed(message) = panel.status() {
        bail!("metric fetch failed: {message}");
    }

    if let Some(path) = &args.svg {
        let (width, height) = (config.chart.width, config.chart.height);
        let commands = panel.render(&Viewport::new(width, height));
        let svg = render_svg(&commands, width, height, config.chart.dark);
        std::fs::write(path, svg).with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote SVG");
    }

    if let Some(path) = &args.csv {
        let table = panel
            .chart()
            .map(|chart| Table::from_pivot(chart.pivot()))
            .unwrap_or_default();
        std::fs::write(path, table.to_csv())
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), rows = table.rows().len(), "wrote CSV");
    }
    Ok(())
}
