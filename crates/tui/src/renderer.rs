use std::io::stdout;

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
        MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use qc_metrics_core::config::DashboardConfig;
use qc_metrics_core::panel::{MetricsPanel, PanelStatus, PlotMode};
use qc_metrics_protocol::{Point, PointRef, RenderCommand, TextAlign, ThemeToken, Viewport};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders},
};

/// Logical pixels per terminal cell. Charts are laid out in pixels and
/// sampled down to cells.
const CELL_W: f64 = 8.0;
const CELL_H: f64 = 16.0;

const SERIES_COLORS: [Color; 10] = [
    Color::Rgb(31, 119, 180),
    Color::Rgb(255, 127, 14),
    Color::Rgb(44, 160, 44),
    Color::Rgb(214, 39, 40),
    Color::Rgb(148, 103, 189),
    Color::Rgb(140, 86, 75),
    Color::Rgb(227, 119, 194),
    Color::Rgb(127, 127, 127),
    Color::Rgb(188, 189, 34),
    Color::Rgb(23, 190, 207),
];

fn theme_to_color(token: ThemeToken) -> Color {
    match token {
        ThemeToken::Series(n) => SERIES_COLORS[n as usize % SERIES_COLORS.len()],
        ThemeToken::Background | ThemeToken::Surface | ThemeToken::PlotBackground => Color::Black,
        ThemeToken::Border | ThemeToken::GridLine => Color::DarkGray,
        ThemeToken::AxisLine => Color::Gray,
        ThemeToken::TextPrimary | ThemeToken::TooltipText => Color::White,
        ThemeToken::TextSecondary | ThemeToken::NoDataText => Color::Gray,
        ThemeToken::TextMuted => Color::DarkGray,
        ThemeToken::HoverHighlight => Color::LightYellow,
        ThemeToken::TooltipBackground => Color::Rgb(40, 40, 40),
        ThemeToken::BannerError => Color::Rgb(92, 29, 29),
        ThemeToken::BannerErrorText => Color::LightRed,
        ThemeToken::BadgeApproved => Color::Green,
        ThemeToken::BadgeFlagged => Color::Yellow,
        ThemeToken::BadgeBlacklisted => Color::Red,
    }
}

/// Cell holding a viewport position.
fn to_cell(p: Point) -> (i32, i32) {
    ((p.x / CELL_W).floor() as i32, (p.y / CELL_H).floor() as i32)
}

/// First column of a text run anchored at `col`.
fn text_start(col: i32, len: usize, align: TextAlign) -> i32 {
    let len = len as i32;
    match align {
        TextAlign::Left => col,
        TextAlign::Center => col - len / 2,
        TextAlign::Right => col - len,
    }
}

/// Draws commands into a buffer region, clipping to it.
struct CellPainter<'a> {
    buf: &'a mut Buffer,
    area: Rect,
}

impl CellPainter<'_> {
    fn put(&mut self, col: i32, row: i32, ch: char, fg: Color, bg: Option<Color>) {
        if col < 0 || row < 0 || col >= i32::from(self.area.width) || row >= i32::from(self.area.height)
        {
            return;
        }
        let cell = &mut self.buf[(self.area.x + col as u16, self.area.y + row as u16)];
        cell.set_char(ch).set_fg(fg);
        if let Some(bg) = bg {
            cell.set_bg(bg);
        }
    }

    fn paint(&mut self, commands: &[RenderCommand]) {
        for cmd in commands {
            match cmd {
                RenderCommand::DrawRect {
                    rect, color, ..
                } => {
                    let (c0, r0) = to_cell(Point::new(rect.x, rect.y));
                    let (c1, r1) = to_cell(Point::new(rect.right(), rect.bottom()));
                    let bg = theme_to_color(*color);
                    if c1 <= c0 + 1 && r1 <= r0 + 1 {
                        // legend swatch
                        self.put(c0, r0, '■', bg, None);
                        continue;
                    }
                    for row in r0..r1.max(r0 + 1) {
                        for col in c0..c1 {
                            self.put(col, row, ' ', Color::Reset, Some(bg));
                        }
                    }
                }
                RenderCommand::DrawCircle {
                    center, color, point, ..
                } => {
                    let (col, row) = to_cell(*center);
                    let ch = if point.is_some() { '●' } else { '◯' };
                    self.put(col, row, ch, theme_to_color(*color), None);
                }
                RenderCommand::DrawLine {
                    from, to, color, ..
                } => self.line(*from, *to, *color),
                RenderCommand::DrawText {
                    position,
                    text,
                    color,
                    align,
                    ..
                } => {
                    let (col, row) = to_cell(*position);
                    // text baselines sit at the bottom of their cell row
                    let row = row - 1;
                    let start = text_start(col, text.chars().count(), *align);
                    for (i, ch) in text.chars().enumerate() {
                        self.put(start + i as i32, row, ch, theme_to_color(*color), None);
                    }
                }
                RenderCommand::SetClip { .. }
                | RenderCommand::ClearClip
                | RenderCommand::BeginGroup { .. }
                | RenderCommand::EndGroup => {}
            }
        }
    }

    fn line(&mut self, from: Point, to: Point, color: ThemeToken) {
        let (c0, r0) = to_cell(from);
        let (c1, r1) = to_cell(to);
        let ch = match color {
            ThemeToken::AxisLine if r0 == r1 => '─',
            ThemeToken::AxisLine => '│',
            ThemeToken::GridLine => '┈',
            _ => '·',
        };
        let steps = (c1 - c0).abs().max((r1 - r0).abs()).max(1);
        for i in 0..=steps {
            let t = f64::from(i) / f64::from(steps);
            let col = c0 + (f64::from(c1 - c0) * t).round() as i32;
            let row = r0 + (f64::from(r1 - r0) * t).round() as i32;
            self.put(col, row, ch, theme_to_color(color), None);
        }
    }
}

/// Every plotted point, series by series.
fn plotted_points(panel: &MetricsPanel) -> Vec<PointRef> {
    let Some(chart) = panel.chart() else {
        return Vec::new();
    };
    chart
        .pivot()
        .series()
        .iter()
        .enumerate()
        .flat_map(|(s, series)| (0..series.bundle.len()).map(move |i| PointRef::new(s, i)))
        .collect()
}

/// Move the selection within (`Left`/`Right`) or across (`Up`/`Down`) series.
fn step_selection(points: &[PointRef], current: Option<PointRef>, code: KeyCode) -> Option<PointRef> {
    let first = points.first().copied();
    let Some(cur) = current else {
        return first;
    };
    let candidate = match code {
        KeyCode::Left => PointRef::new(cur.series, cur.index.saturating_sub(1)),
        KeyCode::Right => PointRef::new(cur.series, cur.index + 1),
        KeyCode::Up => PointRef::new(cur.series.saturating_sub(1), cur.index),
        KeyCode::Down => PointRef::new(cur.series + 1, cur.index),
        _ => cur,
    };
    if points.contains(&candidate) {
        return Some(candidate);
    }
    // switching to a shorter series: clamp to its last point
    points
        .iter()
        .rev()
        .find(|p| p.series == candidate.series)
        .copied()
        .or(Some(cur))
}

pub fn run(
    panel: &mut MetricsPanel,
    config: &DashboardConfig,
    mut reload: impl FnMut(&mut MetricsPanel, PlotMode) -> bool,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut selected: Option<PointRef> = None;
    let mut footer = String::from("←→↑↓ select | enter open | o toggle outliers | q quit");

    loop {
        let term_size = terminal.size()?;
        let content = Rect::new(0, 1, term_size.width, term_size.height.saturating_sub(2));
        let viewport = Viewport::new(
            f64::from(content.width) * CELL_W,
            f64::from(content.height) * CELL_H,
        );

        let mut cmds = panel.render(&viewport);
        if let Some(point) = selected {
            cmds.extend(panel.render_hover(&viewport, point));
        }

        let header_text = match panel.status() {
            PanelStatus::Ready => {
                let count = panel.chart().map_or(0, |c| c.pivot().record_count());
                let mode = match panel.plot_mode() {
                    PlotMode::All => "all points",
                    PlotMode::WithoutOutliers => "outliers removed",
                };
                format!(" qc-metrics | {count} points | {mode} ")
            }
            PanelStatus::Failed(msg) => format!(" qc-metrics | failed: {msg} "),
            PanelStatus::NoData => " qc-metrics | no data ".to_string(),
            PanelStatus::Loading | PanelStatus::Idle => " qc-metrics ".to_string(),
        };

        terminal.draw(|frame| {
            let area = frame.area();
            let header = Block::default()
                .title(header_text.as_str())
                .style(Style::default().fg(Color::White).bg(Color::DarkGray));
            frame.render_widget(header, Rect::new(0, 0, area.width, 1));

            let block = Block::default()
                .borders(Borders::NONE)
                .style(Style::default().bg(Color::Black));
            frame.render_widget(block, content);

            let mut painter = CellPainter {
                buf: frame.buffer_mut(),
                area: content,
            };
            painter.paint(&cmds);

            let footer_block = Block::default()
                .title(footer.as_str())
                .style(Style::default().fg(Color::Gray).bg(Color::Black));
            frame.render_widget(
                footer_block,
                Rect::new(0, area.height.saturating_sub(1), area.width, 1),
            );
        })?;

        if !event::poll(std::time::Duration::from_millis(100))? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                code @ (KeyCode::Left | KeyCode::Right | KeyCode::Up | KeyCode::Down) => {
                    selected = step_selection(&plotted_points(panel), selected, code);
                }
                KeyCode::Enter => {
                    if let Some(point) = selected
                        && let Some(id) = panel.chart().and_then(|c| c.pivot().subject_at(point))
                    {
                        let target = qc_metrics_core::navigation::NavTarget::Session(id.to_string());
                        footer = format!("open {}", target.absolute(&config.server.base_url));
                    }
                }
                KeyCode::Char('o') if panel.outlier_control_visible() => {
                    let mode = match panel.plot_mode() {
                        PlotMode::All => PlotMode::WithoutOutliers,
                        PlotMode::WithoutOutliers => PlotMode::All,
                    };
                    if reload(panel, mode) {
                        selected = None;
                    }
                }
                _ => {}
            },
            Event::Mouse(mouse) if mouse.kind == MouseEventKind::Down(MouseButton::Left) => {
                let pointer = Point::new(
                    (f64::from(mouse.column) + 0.5) * CELL_W,
                    (f64::from(mouse.row.saturating_sub(content.y)) + 0.5) * CELL_H,
                );
                selected = panel.hit_test(&viewport, pointer).or(selected);
                if let Some(target) = panel.click(&viewport, pointer) {
                    footer = format!("open {}", target.absolute(&config.server.base_url));
                }
            }
            _ => {}
        }
    }

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    Ok(())
}
