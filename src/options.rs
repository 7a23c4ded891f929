//! Chart configuration collected by the form.
//!
//! Every field has a default matching the initial state of the form, so a
//! partial JSON document deserializes into a complete configuration.

use crate::downloader::ExportSettings;
use crate::error::{PyramidError, Result};
use lazy_static::lazy_static;
use plotters::style::RGBColor;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

lazy_static! {
    static ref HEX_COLOR_REGEX: Regex = Regex::new(r"^#([0-9A-Fa-f]{6})$").unwrap();
}

/// A `#RRGGBB` color as produced by an HTML color picker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl HexColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        HexColor { r, g, b }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let caps = HEX_COLOR_REGEX.captures(s.trim())?;
        let value = u32::from_str_radix(&caps[1], 16).ok()?;
        Some(HexColor::new(
            (value >> 16) as u8,
            (value >> 8) as u8,
            value as u8,
        ))
    }

    pub fn to_rgb(self) -> RGBColor {
        RGBColor(self.r, self.g, self.b)
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for HexColor {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        HexColor::parse(&s).ok_or_else(|| format!("'{}' is not a #RRGGBB color", s))
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.to_string()
    }
}

/// Where tick marks are drawn relative to the plot area.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickDirection {
    None,
    #[default]
    Outside,
    Inside,
}

/// Names of the three spreadsheet columns the chart reads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    /// Age-band label column
    pub age: String,
    /// Column plotted on the left of the zero axis
    pub left: String,
    /// Column plotted on the right of the zero axis
    pub right: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            age: "Age group".to_string(),
            left: "Male".to_string(),
            right: "Female".to_string(),
        }
    }
}

impl ColumnMapping {
    pub fn required(&self) -> [&str; 3] {
        [&self.age, &self.left, &self.right]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontOptions {
    /// CSS font family list, passed through to the SVG untouched
    pub family: String,
    /// Legend and fallback text
    pub global_size: u32,
    pub title_size: u32,
    /// Axis titles
    pub label_size: u32,
    /// Axis tick labels
    pub tick_size: u32,
    /// Value labels at the end of each bar
    pub bar_text_size: u32,
}

impl Default for FontOptions {
    fn default() -> Self {
        Self {
            family: "SimHei, Arial".to_string(),
            global_size: 12,
            title_size: 24,
            label_size: 16,
            tick_size: 12,
            bar_text_size: 12,
        }
    }
}

/// Grid, border and tick styling for one axis.
///
/// On the x axis `show_line` is the bottom border and `show_mirror_line` the
/// top one; on the y axis they are the left and right borders. A mirror line
/// reuses the color and width of its primary line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisStyle {
    pub show_grid: bool,
    pub grid_color: HexColor,
    pub grid_width: f64,
    pub show_line: bool,
    pub line_color: HexColor,
    pub line_width: f64,
    pub show_mirror_line: bool,
    pub tick_direction: TickDirection,
    pub tick_len: u32,
}

impl Default for AxisStyle {
    fn default() -> Self {
        Self {
            show_grid: false,
            grid_color: HexColor::new(0xE0, 0xE0, 0xE0),
            grid_width: 1.0,
            show_line: true,
            line_color: HexColor::new(0, 0, 0),
            line_width: 2.0,
            show_mirror_line: true,
            tick_direction: TickDirection::Outside,
            tick_len: 5,
        }
    }
}

/// Everything that shapes the chart itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartOptions {
    pub columns: ColumnMapping,
    pub title: String,
    /// Legend entry for the left series
    pub left_name: String,
    /// Legend entry for the right series
    pub right_name: String,
    pub left_color: HexColor,
    pub right_color: HexColor,
    pub x_axis_title: String,
    pub font: FontOptions,
    pub x_axis: AxisStyle,
    pub y_axis: AxisStyle,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            columns: ColumnMapping::default(),
            title: "Population Pyramid".to_string(),
            left_name: "Male".to_string(),
            right_name: "Female".to_string(),
            left_color: HexColor::new(0x3B, 0x82, 0xF6),
            right_color: HexColor::new(0xEF, 0x44, 0x44),
            x_axis_title: "Population (%)".to_string(),
            font: FontOptions::default(),
            x_axis: AxisStyle::default(),
            y_axis: AxisStyle::default(),
        }
    }
}

impl ChartOptions {
    /// Reject values the form controls would never produce.
    pub fn validate(&self) -> Result<()> {
        non_empty("columns.age", &self.columns.age)?;
        non_empty("columns.left", &self.columns.left)?;
        non_empty("columns.right", &self.columns.right)?;
        non_empty("font.family", &self.font.family)?;

        in_range("font.global_size", self.font.global_size, 8, 20)?;
        in_range("font.title_size", self.font.title_size, 16, 40)?;
        in_range("font.label_size", self.font.label_size, 10, 24)?;
        in_range("font.tick_size", self.font.tick_size, 8, 20)?;
        in_range("font.bar_text_size", self.font.bar_text_size, 8, 20)?;

        self.x_axis
            .validate(["x_axis.grid_width", "x_axis.line_width", "x_axis.tick_len"])?;
        self.y_axis
            .validate(["y_axis.grid_width", "y_axis.line_width", "y_axis.tick_len"])
    }
}

impl AxisStyle {
    fn validate(&self, [grid, line, tick]: [&'static str; 3]) -> Result<()> {
        in_range(grid, self.grid_width, 0.5, 5.0)?;
        in_range(line, self.line_width, 0.5, 5.0)?;
        in_range(tick, self.tick_len, 0, 20)
    }
}

/// Chart options plus export settings: the whole form in one document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub chart: ChartOptions,
    pub export: ExportSettings,
}

impl RenderConfig {
    /// Parse the JSON sent by the form. An empty body means all defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(RenderConfig::default());
        }
        serde_json::from_str(json).map_err(|e| PyramidError::InvalidOption {
            field: "config",
            reason: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.chart.validate()?;
        self.export.validate()
    }
}

fn non_empty(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PyramidError::InvalidOption {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

pub(crate) fn in_range<T>(field: &'static str, value: T, min: T, max: T) -> Result<()>
where
    T: PartialOrd + fmt::Display + Copy,
{
    // Written as a negated inclusive check so NaN is rejected too.
    if !(value >= min && value <= max) {
        return Err(PyramidError::InvalidOption {
            field,
            reason: format!("{} is outside {}..={}", value, min, max),
        });
    }
    Ok(())
}
