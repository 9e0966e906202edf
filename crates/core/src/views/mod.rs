pub mod banner;
pub mod metric_chart;
pub mod tooltip;

pub use banner::{render_banners, render_message};
pub use metric_chart::{ChartOptions, MetricChart};
pub use tooltip::{Tooltip, format_metric_value};
