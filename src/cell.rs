use serde::Serialize;
use std::fmt;

/// A single value read from an uploaded spreadsheet.
#[derive(Clone, Serialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Builds a cell from raw text, the way CSV fields arrive.
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        match parse_number(trimmed) {
            Some(num) => CellValue::Number(num),
            None => CellValue::Text(raw.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Numeric view of the cell.
    ///
    /// `Ok(None)` for an empty cell, `Err(text)` when the cell holds text
    /// that does not read as a finite number.
    pub fn to_number(&self) -> Result<Option<f64>, String> {
        match self {
            CellValue::Empty => Ok(None),
            CellValue::Number(n) if n.is_finite() => Ok(Some(*n)),
            CellValue::Number(n) => Err(n.to_string()),
            CellValue::Text(s) => match parse_number(s.trim()) {
                Some(n) => Ok(Some(n)),
                None if s.trim().is_empty() => Ok(None),
                None => Err(s.clone()),
            },
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            // Whole numbers print without a trailing ".0" so that "0-4" style
            // labels stored as numbers read naturally.
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}
