//! The data behind one pyramid: age bands, the mirrored left series and the
//! shared symmetric tick scale.

use crate::cell::CellValue;
use crate::error::{PyramidError, Result};
use crate::options::ColumnMapping;
use crate::table::Table;
use serde::Serialize;

/// Distance between neighbouring x-axis ticks, in percentage points.
pub const TICK_STEP: i64 = 2;

/// The x axis extends this far past the outermost tick on each side, leaving
/// room for the value labels at the end of the longest bars.
pub const AXIS_PADDING: f64 = 1.15;

/// Largest outermost tick the axis will build. Values at or above this are
/// almost certainly head counts rather than percentages.
pub const MAX_TICK_BOUND: i64 = 1000;

/// Example age structure (share of total population, %) used by the
/// downloadable template and the sample renderer. Oldest band first.
pub const SAMPLE_BANDS: &[(&str, f64, f64)] = &[
    ("85+", 0.05, 0.15),
    ("80-84", 0.10, 0.25),
    ("75-79", 0.20, 0.40),
    ("70-74", 0.40, 0.70),
    ("65-69", 0.70, 1.00),
    ("60-64", 1.10, 1.40),
    ("55-59", 1.60, 1.80),
    ("50-54", 2.20, 2.10),
    ("45-49", 2.80, 2.40),
    ("40-44", 3.30, 2.70),
    ("35-39", 3.90, 3.20),
    ("30-34", 4.20, 3.70),
    ("25-29", 4.60, 4.20),
    ("20-24", 4.40, 4.10),
    ("15-19", 4.00, 3.70),
    ("10-14", 4.30, 3.90),
    ("5-9", 5.10, 4.70),
    ("0-4", 6.20, 5.80),
];

/// One row of the uploaded table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AgeBand {
    pub label: String,
    /// Displayed value of the left group; `None` when the cell was empty
    pub left: Option<f64>,
    /// Displayed value of the right group
    pub right: Option<f64>,
}

impl AgeBand {
    /// The left value as plotted, mirrored onto the negative half of the axis.
    pub fn left_plot_value(&self) -> Option<f64> {
        self.left.map(|v| -v)
    }

    /// The right value as plotted; identical to the displayed value.
    pub fn right_plot_value(&self) -> Option<f64> {
        self.right
    }
}

/// Validated pyramid data in table row order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PyramidData {
    bands: Vec<AgeBand>,
}

impl PyramidData {
    pub fn new(bands: Vec<AgeBand>) -> Self {
        PyramidData { bands }
    }

    /// Extract the three configured columns from an uploaded table.
    ///
    /// Fails with [`PyramidError::MissingColumns`] naming all three required
    /// columns when any of them is absent, and with
    /// [`PyramidError::NotNumeric`] when a value cell is not a number.
    pub fn from_table(table: &Table, columns: &ColumnMapping) -> Result<Self> {
        let required = columns.required();
        let missing_error = || PyramidError::MissingColumns {
            required: required.iter().map(|s| s.to_string()).collect(),
            missing: table.missing_columns(&required),
        };
        let ages = table.column(&columns.age).ok_or_else(missing_error)?;
        let lefts = table.column(&columns.left).ok_or_else(missing_error)?;
        let rights = table.column(&columns.right).ok_or_else(missing_error)?;

        if ages.is_empty() {
            return Err(PyramidError::Load(
                "The sheet has a header row but no data rows".to_string(),
            ));
        }

        let to_number = |column: &str, row: usize, cell: &CellValue| {
            cell.to_number().map_err(|value| PyramidError::NotNumeric {
                column: column.to_string(),
                row: row + 1,
                value,
            })
        };

        let mut bands = Vec::with_capacity(ages.len());
        for (row, ((age, left), right)) in ages.into_iter().zip(lefts).zip(rights).enumerate() {
            bands.push(AgeBand {
                label: age.to_string(),
                left: to_number(&columns.left, row, left)?,
                right: to_number(&columns.right, row, right)?,
            });
        }

        let data = PyramidData { bands };
        data.tick_scale()?;
        Ok(data)
    }

    /// The built-in example data.
    pub fn sample() -> Self {
        PyramidData::new(
            SAMPLE_BANDS
                .iter()
                .map(|(label, left, right)| AgeBand {
                    label: label.to_string(),
                    left: Some(*left),
                    right: Some(*right),
                })
                .collect(),
        )
    }

    pub fn bands(&self) -> &[AgeBand] {
        &self.bands
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Vertical position of a row: the first row sits at the top of the
    /// chart, the last row at position 0.
    pub fn position(&self, row: usize) -> f64 {
        (self.bands.len() - 1 - row) as f64
    }

    /// Inverse of [`PyramidData::position`], used by the y-axis label formatter.
    pub fn label_at(&self, position: f64) -> Option<&str> {
        let pos = position.round();
        if pos < 0.0 || pos >= self.bands.len() as f64 {
            return None;
        }
        let row = self.bands.len() - 1 - pos as usize;
        Some(&self.bands[row].label)
    }

    /// Larger of the two series' maxima, ignoring empty cells.
    pub fn max_value(&self) -> f64 {
        self.bands
            .iter()
            .flat_map(|b| [b.left, b.right])
            .flatten()
            .fold(0.0, f64::max)
    }

    pub fn tick_scale(&self) -> Result<TickScale> {
        TickScale::for_max(self.max_value())
    }
}

/// Symmetric x-axis ticks shared by both halves of the pyramid.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TickScale {
    /// Outermost tick on each side, always even
    pub max: i64,
    pub step: i64,
    /// Tick positions from `-max` to `max`
    pub values: Vec<i64>,
    /// Absolute-value labels with a `%` suffix, parallel to `values`
    pub labels: Vec<String>,
}

impl TickScale {
    /// Build the scale for a series maximum.
    ///
    /// The upper bound is the next step boundary strictly above
    /// `max_value`, so a maximum of exactly 6 still gets a tick at 8.
    /// Negative and NaN maxima are treated as 0. A maximum that would push
    /// the bound past [`MAX_TICK_BOUND`] is rejected.
    pub fn for_max(max_value: f64) -> Result<Self> {
        let max_value = if max_value.is_nan() {
            0.0
        } else {
            max_value.max(0.0)
        };
        // Also catches +inf; below the limit the integer math cannot overflow.
        if max_value >= MAX_TICK_BOUND as f64 {
            return Err(PyramidError::TooLarge {
                value: max_value,
                limit: MAX_TICK_BOUND,
            });
        }
        let max = ((max_value / TICK_STEP as f64) as i64 + 1) * TICK_STEP;

        let positive: Vec<i64> = (1..=max / TICK_STEP).map(|i| i * TICK_STEP).collect();
        let values: Vec<i64> = positive
            .iter()
            .rev()
            .map(|v| -v)
            .chain(std::iter::once(0))
            .chain(positive.iter().copied())
            .collect();
        let labels = values.iter().map(|v| format!("{}%", v.abs())).collect();

        Ok(TickScale {
            max,
            step: TICK_STEP,
            values,
            labels,
        })
    }

    /// Visible x range, padded past the outermost ticks.
    pub fn axis_range(&self) -> (f64, f64) {
        let edge = self.max as f64 * AXIS_PADDING;
        (-edge, edge)
    }

    /// Label for a tick position, `None` off the scale.
    pub fn label_for(&self, value: f64) -> Option<&str> {
        self.values
            .iter()
            .position(|v| (*v as f64 - value).abs() < 1e-9)
            .map(|i| self.labels[i].as_str())
    }
}
