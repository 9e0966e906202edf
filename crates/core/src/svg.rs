//! SVG renderer: converts `RenderCommand` lists into standalone SVG strings.

use qc_metrics_protocol::{RenderCommand, TextAlign, ThemeToken};

/// Render a list of commands as an SVG document string.
///
/// `width` and `height` define the SVG viewBox dimensions.
/// `dark` selects the color palette.
pub fn render_svg(commands: &[RenderCommand], width: f64, height: f64, dark: bool) -> String {
    let mut svg = String::with_capacity(commands.len() * 120);
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {width} {height}" width="{width}" height="{height}" style="font-family:system-ui,-apple-system,sans-serif;font-size:11px">"#,
    ));

    let bg = resolve_color(ThemeToken::Background, dark);
    svg.push_str(&format!(
        r#"<rect width="{width}" height="{height}" fill="{bg}"/>"#,
    ));

    let mut clip_id = 0usize;
    let mut clip_open = false;

    for cmd in commands {
        match cmd {
            RenderCommand::DrawRect {
                rect,
                color,
                border_color,
                label,
            } => {
                let fill = resolve_color(*color, dark);
                let stroke = border_color
                    .map(|b| format!(r#" stroke="{}""#, resolve_color(b, dark)))
                    .unwrap_or_default();
                svg.push_str(&format!(
                    r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{fill}"{stroke}>"#,
                    rect.x, rect.y, rect.w, rect.h,
                ));
                if let Some(label) = label {
                    svg.push_str(&format!("<title>{}</title>", escape_xml(label)));
                }
                svg.push_str("</rect>");
            }
            RenderCommand::DrawCircle {
                center,
                radius,
                color,
                point,
            } => {
                let fill = resolve_color(*color, dark);
                let data = point
                    .map(|p| format!(r#" data-series="{}" data-index="{}""#, p.series, p.index))
                    .unwrap_or_default();
                svg.push_str(&format!(
                    r#"<circle cx="{}" cy="{}" r="{radius}" fill="{fill}"{data}/>"#,
                    center.x, center.y,
                ));
            }
            RenderCommand::DrawLine {
                from,
                to,
                color,
                width: line_width,
            } => {
                let stroke = resolve_color(*color, dark);
                svg.push_str(&format!(
                    r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{stroke}" stroke-width="{line_width}"/>"#,
                    from.x, from.y, to.x, to.y,
                ));
            }
            RenderCommand::DrawText {
                text,
                position,
                color,
                font_size,
                align,
            } => {
                let fill = resolve_color(*color, dark);
                let anchor = match align {
                    TextAlign::Left => "start",
                    TextAlign::Center => "middle",
                    TextAlign::Right => "end",
                };
                svg.push_str(&format!(
                    r#"<text x="{}" y="{}" fill="{fill}" font-size="{font_size}" text-anchor="{anchor}">{}</text>"#,
                    position.x,
                    position.y,
                    escape_xml(text),
                ));
            }
            RenderCommand::SetClip { rect } => {
                if clip_open {
                    svg.push_str("</g>");
                }
                clip_id += 1;
                svg.push_str(&format!(
                    r#"<clipPath id="clip{clip_id}"><rect x="{}" y="{}" width="{}" height="{}"/></clipPath><g clip-path="url(#clip{clip_id})">"#,
                    rect.x, rect.y, rect.w, rect.h,
                ));
                clip_open = true;
            }
            RenderCommand::ClearClip => {
                if clip_open {
                    svg.push_str("</g>");
                    clip_open = false;
                }
            }
            // Groups don't affect static SVG output
            RenderCommand::BeginGroup { .. } | RenderCommand::EndGroup => {}
        }
    }

    if clip_open {
        svg.push_str("</g>");
    }
    svg.push_str("</svg>");
    svg
}

/// Hex color of a theme token.
pub fn resolve_color(token: ThemeToken, dark: bool) -> &'static str {
    if let ThemeToken::Series(n) = token {
        return series_color(n, dark);
    }
    if dark {
        match token {
            ThemeToken::Background => "#181818",
            ThemeToken::Surface | ThemeToken::PlotBackground => "#1f1f1f",
            ThemeToken::Border | ThemeToken::GridLine => "#303030",
            ThemeToken::AxisLine => "#616161",
            ThemeToken::TextPrimary | ThemeToken::TooltipText => "#ececec",
            ThemeToken::TextSecondary | ThemeToken::TextMuted | ThemeToken::NoDataText => {
                "#9e9e9e"
            }
            ThemeToken::HoverHighlight => "#ffd600",
            ThemeToken::TooltipBackground => "#2b2b2b",
            ThemeToken::BannerError => "#5c1d1d",
            ThemeToken::BannerErrorText => "#ffcdd2",
            ThemeToken::BadgeApproved => "#4caf50",
            ThemeToken::BadgeFlagged => "#ffa726",
            ThemeToken::BadgeBlacklisted => "#f44336",
            ThemeToken::Series(_) => "#616161",
        }
    } else {
        match token {
            ThemeToken::Background => "#ffffff",
            ThemeToken::Surface | ThemeToken::PlotBackground => "#f8f9fa",
            ThemeToken::Border | ThemeToken::GridLine => "#dee2e6",
            ThemeToken::AxisLine => "#999999",
            ThemeToken::TextPrimary | ThemeToken::TooltipText => "#1a1a2e",
            ThemeToken::TextSecondary | ThemeToken::TextMuted | ThemeToken::NoDataText => {
                "#666677"
            }
            ThemeToken::HoverHighlight => "#e67e22",
            ThemeToken::TooltipBackground => "#ffffff",
            ThemeToken::BannerError => "#f8d7da",
            ThemeToken::BannerErrorText => "#721c24",
            ThemeToken::BadgeApproved => "#27ae60",
            ThemeToken::BadgeFlagged => "#f4845f",
            ThemeToken::BadgeBlacklisted => "#e63946",
            ThemeToken::Series(_) => "#999999",
        }
    }
}

// d3 category10, with a lighter variant for dark backgrounds
fn series_color(n: u8, dark: bool) -> &'static str {
    const LIGHT: [&str; 10] = [
        "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
        "#bcbd22", "#17becf",
    ];
    const DARK: [&str; 10] = [
        "#4e9bd6", "#ffa04d", "#55c755", "#ee5a5b", "#b493d6", "#b98376", "#f0a3d8", "#a6a6a6",
        "#dcdd4a", "#4fd6e4",
    ];
    let palette = if dark { &DARK } else { &LIGHT };
    palette[n as usize % palette.len()]
}

pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
