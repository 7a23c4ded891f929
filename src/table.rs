use crate::cell::CellValue;
use serde::Serialize;

/// An uploaded sheet: one header row followed by data rows.
///
/// Row order is kept exactly as read, since it decides the vertical order of
/// the age bands in the chart.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Table { headers, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Position of the first header equal to `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Every value of the named column, `Empty` where a row is short.
    pub fn column(&self, name: &str) -> Option<Vec<&CellValue>> {
        static EMPTY: CellValue = CellValue::Empty;
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).unwrap_or(&EMPTY))
                .collect(),
        )
    }

    /// Names from `required` that are not among the headers.
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|name| self.column_index(name).is_none())
            .map(|name| name.to_string())
            .collect()
    }

    /// The first `n` rows rendered as display strings, for the data preview.
    pub fn head(&self, n: usize) -> TablePreview {
        TablePreview {
            headers: self.headers.clone(),
            rows: self
                .rows
                .iter()
                .take(n)
                .map(|row| {
                    (0..self.headers.len())
                        .map(|c| row.get(c).map(|v| v.to_string()).unwrap_or_default())
                        .collect()
                })
                .collect(),
            total_rows: self.rows.len(),
        }
    }
}

/// Stringified top of a table, sent back to the page above the chart.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct TablePreview {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
}
