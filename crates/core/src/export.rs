//! CSV export of rendered tables.
//!
//! Cells are joined verbatim: a comma or newline inside a cell is not quoted
//! and will split it on re-import.

use qc_metrics_protocol::QcSearchRecord;

use crate::model::PivotResult;
use crate::views::format_metric_value;

/// Rows of a table as currently displayed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Comma-joined cells, one line per row, `\n` between rows.
    pub fn to_csv(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.join(","))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// QC search results: name, approved, comment.
    pub fn from_search_records(records: &[QcSearchRecord]) -> Self {
        Self {
            rows: records.iter().map(|r| r.cells().to_vec()).collect(),
        }
    }

    /// Long-format dump of a chart: one row per plotted point, under a
    /// header row.
    pub fn from_pivot(pivot: &PivotResult) -> Self {
        let mut table = Self::new();
        table.push_row(
            ["group", "index", "session_id", "session_name", "value"]
                .map(String::from)
                .to_vec(),
        );
        for series in pivot.series() {
            let bundle = &series.bundle;
            let points = bundle
                .values
                .iter()
                .zip(&bundle.subject_ids)
                .zip(&bundle.session_names);
            for (i, ((value, subject), name)) in points.enumerate() {
                table.push_row(vec![
                    series.key.to_string(),
                    i.to_string(),
                    subject.clone(),
                    name.clone(),
                    format_metric_value(*value),
                ]);
            }
        }
        table
    }
}
