use qc_metrics_protocol::{
    Point, PointRef, Rect, RenderCommand, TextAlign, ThemeToken, Viewport,
};
use serde::{Deserialize, Serialize};

use crate::svg::escape_xml;

/// Added before rounding so values stored just below a half step
/// (e.g. `12.005` as `12.00499..`) still round up.
const ROUNDING_EPSILON: f64 = 0.00001;

const TOOLTIP_WIDTH: f64 = 180.0;
const TOOLTIP_HEIGHT: f64 = 40.0;
const TOOLTIP_OFFSET: f64 = 12.0;
const FONT_SIZE: f64 = 11.0;
const PADDING: f64 = 6.0;

/// Round to two decimals, half up.
pub fn round_half_up_2(value: f64) -> f64 {
    ((value + ROUNDING_EPSILON) * 100.0 + 0.5).floor() / 100.0
}

/// Tooltip display of a metric value: two decimals at most, no trailing
/// zeros (`12.005` → `12.01`, `12.0` → `12`).
pub fn format_metric_value(value: f64) -> String {
    if !value.is_finite() {
        return "n/a".to_string();
    }
    let rounded = round_half_up_2(value);
    // avoid "-0"
    if rounded == 0.0 {
        return "0".to_string();
    }
    format!("{rounded}")
}

/// Hover details for a single chart point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tooltip {
    pub point: PointRef,
    /// Session name shown as the tooltip heading.
    pub title: String,
    /// Formatted metric value.
    pub value: String,
}

impl Tooltip {
    pub fn new(point: PointRef, session_name: &str, value: f64) -> Self {
        Self {
            point,
            title: session_name.to_string(),
            value: format_metric_value(value),
        }
    }

    /// HTML table in the `c3-tooltip` markup the dashboard stylesheet expects.
    pub fn to_html(&self) -> String {
        format!(
            "<table class='c3-tooltip'> <tr><th colspan='2'>{}</th></tr>\
             <tr><td>Value:</td><td class='c3-value'>{}</td></tr></table>",
            escape_xml(&self.title),
            escape_xml(&self.value),
        )
    }

    /// Box drawn next to `anchor`, flipped to stay inside the viewport.
    pub fn render(&self, anchor: Point, viewport: &Viewport) -> Vec<RenderCommand> {
        let mut x = anchor.x + TOOLTIP_OFFSET;
        if x + TOOLTIP_WIDTH > viewport.width {
            x = (anchor.x - TOOLTIP_OFFSET - TOOLTIP_WIDTH).max(0.0);
        }
        let mut y = anchor.y - TOOLTIP_HEIGHT - TOOLTIP_OFFSET;
        if y < 0.0 {
            y = anchor.y + TOOLTIP_OFFSET;
        }
        let rect = Rect::new(x, y, TOOLTIP_WIDTH, TOOLTIP_HEIGHT);

        vec![
            RenderCommand::BeginGroup {
                id: "tooltip".to_string(),
                label: None,
            },
            RenderCommand::DrawRect {
                rect,
                color: ThemeToken::TooltipBackground,
                border_color: Some(ThemeToken::Border),
                label: None,
            },
            RenderCommand::DrawText {
                position: Point::new(rect.x + PADDING, rect.y + PADDING + FONT_SIZE),
                text: self.title.clone(),
                color: ThemeToken::TooltipText,
                font_size: FONT_SIZE,
                align: TextAlign::Left,
            },
            RenderCommand::DrawText {
                position: Point::new(rect.x + PADDING, rect.bottom() - PADDING),
                text: format!("Value: {}", self.value),
                color: ThemeToken::TooltipText,
                font_size: FONT_SIZE,
                align: TextAlign::Left,
            },
            RenderCommand::EndGroup,
        ]
    }
}
