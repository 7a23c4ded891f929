use crate::error::{PyramidError, Result};
use crate::options::{AxisStyle, ChartOptions, HexColor, TickDirection};
use crate::pyramid::{PyramidData, TickScale};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::TRANSPARENT;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::error::Error;

/// Center line at x = 0
const ZERO_LINE_COLOR: RGBColor = RGBColor(0xAA, 0xAA, 0xAA);
const ZERO_LINE_WIDTH: f64 = 1.5;

const TEXT_COLOR: RGBColor = RGBColor(0x44, 0x44, 0x44);
const TICK_COLOR: RGBColor = RGBColor(0x44, 0x44, 0x44);

/// Share of each category band covered by its bar.
const BAR_FILL: f64 = 0.9;

/// Pixel gap between a bar end and its value label.
const BAR_LABEL_OFFSET: i32 = 4;

const MARGIN: i32 = 10;
const MARGIN_RIGHT: i32 = 40;

/// Creates a population pyramid chart
///
/// Draws the right group as positive bars and the left group as negated
/// bars around a shared zero line, with symmetric percentage ticks, value
/// labels at the bar ends, and all cosmetic options applied.
///
/// # Arguments
/// * `data` - Age bands in table row order (first row at the top)
/// * `options` - Chart styling options
/// * `size` - Width and height of the chart in pixels
///
/// # Returns
/// * A Result containing the chart as an SVG document or an error
///
/// # Examples
/// ```
/// use popyramid::graph::create_pyramid_chart;
/// use popyramid::options::ChartOptions;
/// use popyramid::pyramid::PyramidData;
///
/// let svg = create_pyramid_chart(&PyramidData::sample(), &ChartOptions::default(), (1200, 700))
///     .unwrap();
/// assert!(svg.starts_with("<svg"));
/// ```
pub fn create_pyramid_chart(
    data: &PyramidData,
    options: &ChartOptions,
    size: (u32, u32),
) -> Result<String> {
    if data.is_empty() {
        return Err(PyramidError::Render("no age bands to draw".to_string()));
    }

    let scale = data.tick_scale()?;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        draw_pyramid(&root, data, &scale, options).map_err(|e| PyramidError::Render(e.to_string()))?;
        root.present()
            .map_err(|e| PyramidError::Render(e.to_string()))?;
    }

    log::debug!(
        "rendered pyramid with {} bands at {}x{}",
        data.len(),
        size.0,
        size.1
    );
    Ok(svg)
}

/// Draws every layer of the chart onto `root`
///
/// # Implementation Notes
/// * plotters lays out the label areas and the tick labels; its own axis
///   lines and tick marks are made transparent
/// * The centered title and the legend sit in the top margin
/// * Grid lines, tick marks and the four box borders are drawn by hand so
///   each axis and each side can be styled on its own
/// * Layer order: grid, zero line, bars, bar labels, ticks, borders, title and legend
fn draw_pyramid(
    root: &DrawingArea<SVGBackend<'_>, Shift>,
    data: &PyramidData,
    scale: &TickScale,
    options: &ChartOptions,
) -> std::result::Result<(), Box<dyn Error>> {
    root.fill(&WHITE)?;

    let font = &options.font;
    let family = font.family.as_str();
    let (x_min, x_max) = scale.axis_range();
    let (y_min, y_max) = (-0.5, data.len() as f64 - 0.5);

    // Label areas grow with the fonts and with outward ticks.
    let legend_band = font.global_size as i32 + 16;
    let x_label_area = outward_len(&options.x_axis)
        + font.tick_size as i32
        + font.label_size as i32
        + 18;
    let widest_band = data
        .bands()
        .iter()
        .map(|b| text_width(&b.label, font.tick_size))
        .max()
        .unwrap_or(0);
    let y_label_area = outward_len(&options.y_axis) + widest_band + font.label_size as i32 + 20;

    let x_spec = (x_min..x_max).with_key_points(
        scale
            .values
            .iter()
            .map(|v| *v as f64)
            .collect::<Vec<_>>(),
    );
    let y_spec = (y_min..y_max).with_key_points(
        (0..data.len()).map(|i| i as f64).collect::<Vec<_>>(),
    );

    let title_band = if options.title.trim().is_empty() {
        0
    } else {
        font.title_size as i32 + 8
    };

    let mut chart = ChartBuilder::on(root)
        .margin_top(MARGIN + title_band + legend_band)
        .margin_bottom(MARGIN)
        .margin_left(MARGIN)
        .margin_right(MARGIN_RIGHT)
        .set_label_area_size(LabelAreaPosition::Bottom, x_label_area)
        .set_label_area_size(LabelAreaPosition::Left, y_label_area)
        .build_cartesian_2d(x_spec, y_spec)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .axis_style(TRANSPARENT.stroke_width(1))
        .set_tick_mark_size(LabelAreaPosition::Bottom, tick_mark_size(&options.x_axis))
        .set_tick_mark_size(LabelAreaPosition::Left, tick_mark_size(&options.y_axis))
        .x_labels(scale.values.len())
        .y_labels(data.len())
        .x_label_formatter(&|v| scale.label_for(*v).unwrap_or_default().to_string())
        .y_label_formatter(&|v| data.label_at(*v).unwrap_or_default().to_string())
        .x_label_style((family, font.tick_size as f64).into_font().color(&TEXT_COLOR))
        .y_label_style((family, font.tick_size as f64).into_font().color(&TEXT_COLOR))
        .x_desc(options.x_axis_title.as_str())
        .y_desc(options.columns.age.as_str())
        .axis_desc_style((family, font.label_size as f64).into_font().color(&TEXT_COLOR))
        .draw()?;

    // Grid
    if options.x_axis.show_grid {
        let style = line_style(options.x_axis.grid_color, options.x_axis.grid_width);
        chart.draw_series(
            scale
                .values
                .iter()
                .map(|v| PathElement::new(vec![(*v as f64, y_min), (*v as f64, y_max)], style)),
        )?;
    }
    if options.y_axis.show_grid {
        let style = line_style(options.y_axis.grid_color, options.y_axis.grid_width);
        chart.draw_series(
            (0..data.len())
                .map(|row| data.position(row))
                .map(|y| PathElement::new(vec![(x_min, y), (x_max, y)], style)),
        )?;
    }

    chart.draw_series(std::iter::once(PathElement::new(
        vec![(0.0, y_min), (0.0, y_max)],
        ZERO_LINE_COLOR.stroke_width(stroke(ZERO_LINE_WIDTH)),
    )))?;

    // Bars
    let half = BAR_FILL / 2.0;
    let right_fill = options.right_color.to_rgb().filled();
    let left_fill = options.left_color.to_rgb().filled();
    chart.draw_series(data.bands().iter().enumerate().filter_map(|(row, band)| {
        let y = data.position(row);
        band.right_plot_value()
            .map(|v| Rectangle::new([(0.0, y - half), (v, y + half)], right_fill))
    }))?;
    chart.draw_series(data.bands().iter().enumerate().filter_map(|(row, band)| {
        let y = data.position(row);
        band.left_plot_value()
            .map(|v| Rectangle::new([(v, y - half), (0.0, y + half)], left_fill))
    }))?;

    // Value labels sit outside the bar end: right of right bars, left of left bars.
    let bar_font = (family, font.bar_text_size as f64)
        .into_font()
        .color(&TEXT_COLOR);
    let right_label = bar_font.clone().pos(Pos::new(HPos::Left, VPos::Center));
    let left_label = bar_font.pos(Pos::new(HPos::Right, VPos::Center));
    chart.draw_series(data.bands().iter().enumerate().filter_map(|(row, band)| {
        let y = data.position(row);
        band.right.map(|v| {
            EmptyElement::at((v, y))
                + Text::new(format_bar_value(v), (BAR_LABEL_OFFSET, 0), right_label.clone())
        })
    }))?;
    chart.draw_series(data.bands().iter().enumerate().filter_map(|(row, band)| {
        let y = data.position(row);
        match (band.left, band.left_plot_value()) {
            (Some(shown), Some(plotted)) => Some(
                EmptyElement::at((plotted, y))
                    + Text::new(format_bar_value(shown), (-BAR_LABEL_OFFSET, 0), left_label.clone()),
            ),
            _ => None,
        }
    }))?;

    // Everything below is positioned in backend pixels around the plot area.
    let (plot_x, plot_y) = chart.plotting_area().get_pixel_range();
    let (left, right) = (plot_x.start, plot_x.end - 1);
    let (top, bottom) = (plot_y.start, plot_y.end - 1);

    let tick_style = TICK_COLOR.stroke_width(1);
    if let Some(dir) = tick_sign(&options.x_axis) {
        let len = options.x_axis.tick_len as i32 * dir;
        for v in &scale.values {
            let (px, _) = chart.backend_coord(&(*v as f64, y_min));
            root.draw(&PathElement::new(vec![(px, bottom), (px, bottom + len)], tick_style))?;
        }
    }
    if let Some(dir) = tick_sign(&options.y_axis) {
        let len = options.y_axis.tick_len as i32 * dir;
        for row in 0..data.len() {
            let (_, py) = chart.backend_coord(&(x_min, data.position(row)));
            root.draw(&PathElement::new(vec![(left, py), (left - len, py)], tick_style))?;
        }
    }

    // Box borders: bottom/top share the x line style, left/right the y one.
    let x_line = line_style(options.x_axis.line_color, options.x_axis.line_width);
    let y_line = line_style(options.y_axis.line_color, options.y_axis.line_width);
    let borders = [
        (options.x_axis.show_line, [(left, bottom), (right, bottom)], x_line),
        (options.x_axis.show_mirror_line, [(left, top), (right, top)], x_line),
        (options.y_axis.show_line, [(left, top), (left, bottom)], y_line),
        (options.y_axis.show_mirror_line, [(right, top), (right, bottom)], y_line),
    ];
    for (shown, points, style) in borders {
        if shown {
            root.draw(&PathElement::new(points.to_vec(), style))?;
        }
    }

    if title_band > 0 {
        let (width, _) = root.dim_in_pixel();
        let style = (family, font.title_size as f64)
            .into_font()
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Top));
        root.draw(&Text::new(
            options.title.as_str(),
            (width as i32 / 2, MARGIN),
            style,
        ))?;
    }
    draw_legend(root, options, right, top - legend_band / 2)?;

    Ok(())
}

/// Draws the horizontal legend, right-aligned to `right_edge`
///
/// Entries follow series order, right group first, so the left group's
/// entry ends up rightmost.
fn draw_legend(
    root: &DrawingArea<SVGBackend<'_>, Shift>,
    options: &ChartOptions,
    right_edge: i32,
    center_y: i32,
) -> std::result::Result<(), Box<dyn Error>> {
    let size = options.font.global_size;
    let swatch = size as i32;
    let style = (options.font.family.as_str(), size as f64)
        .into_font()
        .color(&TEXT_COLOR)
        .pos(Pos::new(HPos::Left, VPos::Center));

    let entries = [
        (options.right_name.as_str(), options.right_color),
        (options.left_name.as_str(), options.left_color),
    ];

    let mut x = right_edge;
    for (name, color) in entries.iter().rev() {
        x -= text_width(name, size);
        root.draw(&Text::new(*name, (x, center_y), style.clone()))?;
        x -= 6 + swatch;
        root.draw(&Rectangle::new(
            [(x, center_y - swatch / 2), (x + swatch, center_y + swatch / 2)],
            color.to_rgb().filled(),
        ))?;
        x -= 16;
    }

    Ok(())
}

/// Value label shown at the end of a bar, e.g. `5.30%`.
pub fn format_bar_value(value: f64) -> String {
    format!("{:.2}%", value)
}

fn line_style(color: HexColor, width: f64) -> ShapeStyle {
    color.to_rgb().stroke_width(stroke(width))
}

// plotters strokes are whole pixels; half-pixel widths round up.
fn stroke(width: f64) -> u32 {
    width.round().max(1.0) as u32
}

fn tick_sign(axis: &AxisStyle) -> Option<i32> {
    match axis.tick_direction {
        TickDirection::None => None,
        _ if axis.tick_len == 0 => None,
        TickDirection::Outside => Some(1),
        TickDirection::Inside => Some(-1),
    }
}

// Signed size handed to plotters so tick labels clear outward ticks.
fn tick_mark_size(axis: &AxisStyle) -> i32 {
    tick_sign(axis).map_or(0, |sign| sign * axis.tick_len as i32)
}

fn outward_len(axis: &AxisStyle) -> i32 {
    tick_mark_size(axis).max(0)
}

/// Rough rendered width of `text` in pixels at font `size`.
///
/// Wide (CJK) glyphs count as a full em, everything else as 0.6 em.
fn text_width(text: &str, size: u32) -> i32 {
    let ems: f64 = text
        .chars()
        .map(|c| if c.is_ascii() { 0.6 } else { 1.0 })
        .sum();
    (ems * size as f64).ceil() as i32
}
