pub mod commands;
pub mod records;
pub mod theme;
pub mod types;

pub use commands::{PointRef, RenderCommand, TextAlign};
pub use records::{MetricRecord, MetricResponse, QcSearchRecord};
pub use theme::ThemeToken;
pub use types::{Point, Rect, Viewport};
