use std::time::Duration;

use qc_metrics_core::config::DashboardConfig;
use qc_metrics_core::panel::{FetchError, MetricsPanel, PendingFetch, PlotMode};
use qc_metrics_core::parsers::{ParseError, parse_metric_response};
use qc_metrics_core::query::Selection;
use qc_metrics_protocol::MetricRecord;
use reqwest::blocking::Client;

/// Where chart records come from.
pub enum Source {
    /// A saved endpoint reply.
    File(Vec<MetricRecord>),
    Server {
        client: Client,
        config: DashboardConfig,
        selection: Selection,
    },
}

impl Source {
    pub fn server(config: DashboardConfig, selection: Selection) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Source::Server {
            client,
            config,
            selection,
        })
    }

    /// Fill `panel` in `mode`. Returns `false` when no fetch could be
    /// started: the selection is incomplete.
    pub fn load(&self, panel: &mut MetricsPanel, mode: PlotMode) -> bool {
        match self {
            Source::File(records) => {
                panel.show(records, mode);
                true
            }
            Source::Server {
                client,
                config,
                selection,
            } => {
                let Some(ticket) = panel.request(selection, mode) else {
                    return false;
                };
                let outcome = fetch(client, config, &ticket);
                panel.resolve(ticket.id, outcome);
                true
            }
        }
    }
}

fn fetch(
    client: &Client,
    config: &DashboardConfig,
    ticket: &PendingFetch,
) -> Result<Vec<MetricRecord>, FetchError> {
    let url = config.metric_url(&ticket.params);
    tracing::info!(%url, id = ticket.id, "fetching metric data");

    let response = client
        .get(&url)
        .send()
        .map_err(|e| FetchError::Network(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    let body = response
        .bytes()
        .map_err(|e| FetchError::Network(e.to_string()))?;
    parse_metric_response(&body).map_err(|e| FetchError::Parse(ParseError::from(e)))
}
