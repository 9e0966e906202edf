use qc_metrics_protocol::{
    Point, PointRef, Rect, RenderCommand, TextAlign, ThemeToken, Viewport,
};

use crate::model::PivotResult;
use crate::navigation::NavTarget;
use crate::views::tooltip::{Tooltip, format_metric_value};

const MARGIN_LEFT: f64 = 56.0;
const MARGIN_RIGHT: f64 = 16.0;
const MARGIN_TOP: f64 = 16.0;
const MARGIN_BOTTOM: f64 = 36.0;
const LEGEND_ROW_HEIGHT: f64 = 18.0;
const LEGEND_SWATCH: f64 = 10.0;
const LEGEND_CHAR_WIDTH: f64 = 6.5;
const FONT_SIZE: f64 = 11.0;
const Y_TICKS: usize = 5;
const Y_PADDING_RATIO: f64 = 0.05;
const MIN_PLOT_SIZE: f64 = 20.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    pub point_radius: f64,
    /// Pointer distance within which a point counts as hit.
    pub pick_radius: f64,
    pub x_label: String,
    /// Connect consecutive points of a series.
    pub show_lines: bool,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            point_radius: 2.5,
            pick_radius: 8.0,
            x_label: "Time".to_string(),
            show_lines: true,
        }
    }
}

/// Line chart of pivoted metric series on a shared index axis.
///
/// Owns the pivot so click and hover handlers resolve points against the
/// same data that was drawn.
#[derive(Debug, Clone)]
pub struct MetricChart {
    pivot: PivotResult,
    options: ChartOptions,
}

/// Geometry shared by rendering and hit-testing.
#[derive(Debug, Clone, Copy)]
struct Layout {
    plot: Rect,
    categories: usize,
    y_min: f64,
    y_max: f64,
}

impl Layout {
    fn compute(pivot: &PivotResult, viewport: &Viewport) -> Option<Self> {
        let categories = pivot.max_len()?;
        if categories == 0 || viewport.is_empty() {
            return None;
        }

        let legend_rows = legend_rows(pivot, viewport.width);
        let plot = Rect::new(
            MARGIN_LEFT,
            MARGIN_TOP,
            viewport.width - MARGIN_LEFT - MARGIN_RIGHT,
            viewport.height - MARGIN_TOP - MARGIN_BOTTOM - legend_rows as f64 * LEGEND_ROW_HEIGHT,
        );
        if plot.w < MIN_PLOT_SIZE || plot.h < MIN_PLOT_SIZE {
            return None;
        }

        let (y_min, y_max) = value_range(pivot);
        Some(Self {
            plot,
            categories,
            y_min,
            y_max,
        })
    }

    fn x_for(&self, index: usize) -> f64 {
        if self.categories <= 1 {
            self.plot.x + self.plot.w / 2.0
        } else {
            self.plot.x + index as f64 * self.plot.w / (self.categories - 1) as f64
        }
    }

    fn y_for(&self, value: f64) -> f64 {
        let t = (value - self.y_min) / (self.y_max - self.y_min);
        self.plot.bottom() - t * self.plot.h
    }
}

fn value_range(pivot: &PivotResult) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for series in pivot.series() {
        for &v in series.bundle.values.iter().filter(|v| v.is_finite()) {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    if lo == hi {
        return (lo - 1.0, hi + 1.0); // avoid zero range
    }
    let pad = (hi - lo) * Y_PADDING_RATIO;
    (lo - pad, hi + pad)
}

fn legend_entry_width(label: &str) -> f64 {
    LEGEND_SWATCH + 6.0 + label.chars().count() as f64 * LEGEND_CHAR_WIDTH + 16.0
}

fn legend_rows(pivot: &PivotResult, width: f64) -> usize {
    if pivot.is_empty() {
        return 0;
    }
    let usable = (width - MARGIN_LEFT - MARGIN_RIGHT).max(1.0);
    let mut rows = 1;
    let mut x = 0.0;
    for series in pivot.series() {
        let w = legend_entry_width(series.key.as_str());
        if x > 0.0 && x + w > usable {
            rows += 1;
            x = 0.0;
        }
        x += w;
    }
    rows
}

impl MetricChart {
    pub fn new(pivot: PivotResult) -> Self {
        Self::with_options(pivot, ChartOptions::default())
    }

    pub fn with_options(pivot: PivotResult, options: ChartOptions) -> Self {
        Self { pivot, options }
    }

    pub fn pivot(&self) -> &PivotResult {
        &self.pivot
    }

    pub fn options(&self) -> &ChartOptions {
        &self.options
    }

    /// Render the chart. Returns no commands when there is nothing to plot or
    /// the viewport is too small.
    pub fn render(&self, viewport: &Viewport) -> Vec<RenderCommand> {
        let Some(layout) = Layout::compute(&self.pivot, viewport) else {
            return Vec::new();
        };
        let plot = layout.plot;
        let mut commands = Vec::with_capacity(self.pivot.record_count() * 2 + 32);

        commands.push(RenderCommand::BeginGroup {
            id: "metric-chart".to_string(),
            label: None,
        });

        commands.push(RenderCommand::DrawRect {
            rect: plot,
            color: ThemeToken::PlotBackground,
            border_color: Some(ThemeToken::Border),
            label: None,
        });

        // Horizontal gridlines with y tick labels
        for i in 0..Y_TICKS {
            let t = i as f64 / (Y_TICKS - 1) as f64;
            let value = layout.y_min + t * (layout.y_max - layout.y_min);
            let y = layout.y_for(value);
            commands.push(RenderCommand::DrawLine {
                from: Point::new(plot.x, y),
                to: Point::new(plot.right(), y),
                color: ThemeToken::GridLine,
                width: 0.5,
            });
            commands.push(RenderCommand::DrawText {
                position: Point::new(plot.x - 6.0, y + FONT_SIZE / 3.0),
                text: format_metric_value(value),
                color: ThemeToken::TextMuted,
                font_size: FONT_SIZE,
                align: TextAlign::Right,
            });
        }

        // Axes (the category axis carries no tick values)
        commands.push(RenderCommand::DrawLine {
            from: Point::new(plot.x, plot.bottom()),
            to: Point::new(plot.right(), plot.bottom()),
            color: ThemeToken::AxisLine,
            width: 1.0,
        });
        commands.push(RenderCommand::DrawLine {
            from: Point::new(plot.x, plot.y),
            to: Point::new(plot.x, plot.bottom()),
            color: ThemeToken::AxisLine,
            width: 1.0,
        });
        commands.push(RenderCommand::DrawText {
            position: Point::new(plot.right(), plot.bottom() + FONT_SIZE + 8.0),
            text: self.options.x_label.clone(),
            color: ThemeToken::TextSecondary,
            font_size: FONT_SIZE,
            align: TextAlign::Right,
        });

        commands.push(RenderCommand::SetClip { rect: plot });
        for (series_idx, series) in self.pivot.series().iter().enumerate() {
            let color = ThemeToken::series(series_idx);
            commands.push(RenderCommand::BeginGroup {
                id: format!("series-{series_idx}"),
                label: Some(series.key.to_string()),
            });

            let points: Vec<(usize, Point)> = series
                .bundle
                .values
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_finite())
                .map(|(i, &v)| (i, Point::new(layout.x_for(i), layout.y_for(v))))
                .collect();

            if self.options.show_lines {
                for pair in points.windows(2) {
                    commands.push(RenderCommand::DrawLine {
                        from: pair[0].1,
                        to: pair[1].1,
                        color,
                        width: 1.5,
                    });
                }
            }
            for (index, center) in &points {
                commands.push(RenderCommand::DrawCircle {
                    center: *center,
                    radius: self.options.point_radius,
                    color,
                    point: Some(PointRef::new(series_idx, *index)),
                });
            }

            commands.push(RenderCommand::EndGroup);
        }
        commands.push(RenderCommand::ClearClip);

        self.render_legend(&layout, viewport, &mut commands);

        commands.push(RenderCommand::EndGroup);
        commands
    }

    fn render_legend(&self, layout: &Layout, viewport: &Viewport, out: &mut Vec<RenderCommand>) {
        let usable = viewport.width - MARGIN_LEFT - MARGIN_RIGHT;
        let top = layout.plot.bottom() + MARGIN_BOTTOM - 8.0;
        let mut x = 0.0;
        let mut row = 0usize;

        for (series_idx, series) in self.pivot.series().iter().enumerate() {
            let label = series.key.as_str();
            let w = legend_entry_width(label);
            if x > 0.0 && x + w > usable {
                row += 1;
                x = 0.0;
            }
            let left = MARGIN_LEFT + x;
            let y = top + row as f64 * LEGEND_ROW_HEIGHT;
            out.push(RenderCommand::DrawRect {
                rect: Rect::new(left, y, LEGEND_SWATCH, LEGEND_SWATCH),
                color: ThemeToken::series(series_idx),
                border_color: None,
                label: None,
            });
            out.push(RenderCommand::DrawText {
                position: Point::new(left + LEGEND_SWATCH + 6.0, y + LEGEND_SWATCH),
                text: label.to_string(),
                color: ThemeToken::TextPrimary,
                font_size: FONT_SIZE,
                align: TextAlign::Left,
            });
            x += w;
        }
    }

    /// Position of a data point in viewport coordinates.
    pub fn point_position(&self, viewport: &Viewport, point: PointRef) -> Option<Point> {
        let layout = Layout::compute(&self.pivot, viewport)?;
        let value = self.pivot.value_at(point)?;
        value
            .is_finite()
            .then(|| Point::new(layout.x_for(point.index), layout.y_for(value)))
    }

    /// Nearest data point within the pick radius of `pointer`.
    pub fn hit_test(&self, viewport: &Viewport, pointer: Point) -> Option<PointRef> {
        let layout = Layout::compute(&self.pivot, viewport)?;
        let max_dist_sq = self.options.pick_radius * self.options.pick_radius;

        let mut best: Option<(f64, PointRef)> = None;
        for (series_idx, series) in self.pivot.series().iter().enumerate() {
            for (index, &value) in series.bundle.values.iter().enumerate() {
                if !value.is_finite() {
                    continue;
                }
                let center = Point::new(layout.x_for(index), layout.y_for(value));
                let dist_sq = center.distance_sq(&pointer);
                if dist_sq <= max_dist_sq && best.is_none_or(|(d, _)| dist_sq < d) {
                    best = Some((dist_sq, PointRef::new(series_idx, index)));
                }
            }
        }
        best.map(|(_, p)| p)
    }

    /// Drill-through target of a click: the session behind the clicked point.
    pub fn click(&self, viewport: &Viewport, pointer: Point) -> Option<NavTarget> {
        let point = self.hit_test(viewport, pointer)?;
        self.pivot
            .subject_at(point)
            .map(|id| NavTarget::Session(id.to_string()))
    }

    pub fn tooltip(&self, point: PointRef) -> Option<Tooltip> {
        let name = self.pivot.session_name_at(point)?;
        let value = self.pivot.value_at(point)?;
        Some(Tooltip::new(point, name, value))
    }

    pub fn tooltip_at(&self, viewport: &Viewport, pointer: Point) -> Option<Tooltip> {
        self.tooltip(self.hit_test(viewport, pointer)?)
    }

    /// Highlight ring and tooltip box for a hovered point.
    pub fn render_hover(&self, viewport: &Viewport, point: PointRef) -> Vec<RenderCommand> {
        let (Some(center), Some(tooltip)) =
            (self.point_position(viewport, point), self.tooltip(point))
        else {
            return Vec::new();
        };
        let mut commands = vec![RenderCommand::DrawCircle {
            center,
            radius: self.options.point_radius * 2.0,
            color: ThemeToken::HoverHighlight,
            point: None,
        }];
        commands.extend(tooltip.render(center, viewport));
        commands
    }
}
