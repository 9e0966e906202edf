//! Full-panel messages and error banners.

use qc_metrics_protocol::{Point, Rect, RenderCommand, TextAlign, ThemeToken, Viewport};

const BANNER_HEIGHT: f64 = 28.0;
const BANNER_GAP: f64 = 4.0;
const FONT_SIZE: f64 = 12.0;

/// Centered message shown in place of a chart ("no data", "loading").
pub fn render_message(text: &str, viewport: &Viewport) -> Vec<RenderCommand> {
    if viewport.is_empty() {
        return Vec::new();
    }
    vec![
        RenderCommand::BeginGroup {
            id: "panel-message".to_string(),
            label: None,
        },
        RenderCommand::DrawRect {
            rect: Rect::new(0.0, 0.0, viewport.width, viewport.height),
            color: ThemeToken::Surface,
            border_color: None,
            label: None,
        },
        RenderCommand::DrawText {
            position: Point::new(viewport.width / 2.0, viewport.height / 2.0),
            text: text.to_string(),
            color: ThemeToken::NoDataText,
            font_size: FONT_SIZE,
            align: TextAlign::Center,
        },
        RenderCommand::EndGroup,
    ]
}

/// Stack of dismissable error banners along the top edge.
pub fn render_banners<S: AsRef<str>>(messages: &[S], viewport: &Viewport) -> Vec<RenderCommand> {
    if messages.is_empty() || viewport.is_empty() {
        return Vec::new();
    }
    let mut commands = Vec::with_capacity(messages.len() * 2 + 2);
    commands.push(RenderCommand::BeginGroup {
        id: "banners".to_string(),
        label: None,
    });
    for (i, message) in messages.iter().enumerate() {
        let y = i as f64 * (BANNER_HEIGHT + BANNER_GAP);
        commands.push(RenderCommand::DrawRect {
            rect: Rect::new(0.0, y, viewport.width, BANNER_HEIGHT),
            color: ThemeToken::BannerError,
            border_color: None,
            label: Some(message.as_ref().to_string()),
        });
        commands.push(RenderCommand::DrawText {
            position: Point::new(8.0, y + BANNER_HEIGHT / 2.0 + FONT_SIZE / 3.0),
            text: message.as_ref().to_string(),
            color: ThemeToken::BannerErrorText,
            font_size: FONT_SIZE,
            align: TextAlign::Left,
        });
    }
    commands.push(RenderCommand::EndGroup);
    commands
}
