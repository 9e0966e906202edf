use serde::{Deserialize, Serialize};

/// Number of distinct series colors in the palette. Series indices wrap.
pub const SERIES_PALETTE_LEN: u8 = 10;

/// Semantic color tokens resolved by the renderer's active theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThemeToken {
    Background,
    Surface,
    Border,

    PlotBackground,
    AxisLine,
    GridLine,

    TextPrimary,
    TextSecondary,
    TextMuted,

    /// Color of the n-th plotted series, `0..SERIES_PALETTE_LEN`.
    Series(u8),

    HoverHighlight,
    TooltipBackground,
    TooltipText,

    // Panel messages
    NoDataText,
    BannerError,
    BannerErrorText,

    // Review badges
    BadgeApproved,
    BadgeFlagged,
    BadgeBlacklisted,
}

impl ThemeToken {
    /// Palette token for a chart series position.
    pub fn series(index: usize) -> Self {
        Self::Series((index % SERIES_PALETTE_LEN as usize) as u8)
    }
}
