use crate::error::{PyramidError, Result};
use crate::options::{ColumnMapping, in_range};
use crate::pyramid::SAMPLE_BANDS;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Screen resolution assumed by the PNG scale factor.
pub const SCREEN_DPI: f64 = 96.0;

pub const MM_PER_INCH: f64 = 25.4;

lazy_static! {
    static ref PNG_FONTS: Arc<resvg::usvg::fontdb::Database> = {
        let mut db = resvg::usvg::fontdb::Database::new();
        db.load_system_fonts();
        log::debug!("loaded {} font faces for PNG export", db.len());
        Arc::new(db)
    };
    static ref PDF_FONTS: Arc<svg2pdf::usvg::fontdb::Database> = {
        let mut db = svg2pdf::usvg::fontdb::Database::new();
        db.load_system_fonts();
        log::debug!("loaded {} font faces for PDF export", db.len());
        Arc::new(db)
    };
}

/// Unit the export width and height are entered in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportUnit {
    #[default]
    Px,
    Mm,
}

/// Export size settings from the form
///
/// Only the pair of dimensions matching `unit` is used; the other pair keeps
/// whatever the form last held.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub unit: ExportUnit,
    pub width_px: u32,
    pub height_px: u32,
    pub width_mm: f64,
    pub height_mm: f64,
    /// Used for mm conversion and for the PNG scale factor
    pub dpi: u32,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            unit: ExportUnit::Px,
            width_px: 1200,
            height_px: 700,
            width_mm: 150.0,
            height_mm: 100.0,
            dpi: 300,
        }
    }
}

impl ExportSettings {
    pub fn validate(&self) -> Result<()> {
        in_range("export.dpi", self.dpi, 150, 600)?;
        match self.unit {
            ExportUnit::Px => {
                in_range("export.width_px", self.width_px, 500, 5000)?;
                in_range("export.height_px", self.height_px, 300, 5000)
            }
            ExportUnit::Mm => {
                in_range("export.width_mm", self.width_mm, 10.0, 500.0)?;
                in_range("export.height_mm", self.height_mm, 10.0, 500.0)
            }
        }
    }

    /// Base pixel size of the exported chart.
    ///
    /// # Examples
    /// ```
    /// use popyramid::downloader::{ExportSettings, ExportUnit};
    ///
    /// let settings = ExportSettings {
    ///     unit: ExportUnit::Mm,
    ///     width_mm: 150.0,
    ///     height_mm: 100.0,
    ///     dpi: 300,
    ///     ..ExportSettings::default()
    /// };
    /// assert_eq!(settings.pixel_size(), (1772, 1181));
    /// ```
    pub fn pixel_size(&self) -> (u32, u32) {
        match self.unit {
            ExportUnit::Px => (self.width_px, self.height_px),
            ExportUnit::Mm => (
                mm_to_px(self.width_mm, self.dpi),
                mm_to_px(self.height_mm, self.dpi),
            ),
        }
    }

    /// Raster scale applied on top of the base pixel size for PNG output.
    pub fn png_scale(&self) -> f64 {
        self.dpi as f64 / SCREEN_DPI
    }

    /// Final PNG size after scaling.
    pub fn png_size(&self) -> (u32, u32) {
        let (w, h) = self.pixel_size();
        let scale = self.png_scale();
        (
            (w as f64 * scale).round() as u32,
            (h as f64 * scale).round() as u32,
        )
    }
}

/// Convert a length in millimetres to pixels at `dpi`.
pub fn mm_to_px(mm: f64, dpi: u32) -> u32 {
    (mm / MM_PER_INCH * dpi as f64).round() as u32
}

/// Downloadable output formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Svg,
    Pdf,
    Png,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Svg => "svg",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Png => "png",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ExportFormat::Svg => "image/svg+xml",
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Png => "image/png",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = PyramidError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "svg" => Ok(ExportFormat::Svg),
            "pdf" => Ok(ExportFormat::Pdf),
            "png" => Ok(ExportFormat::Png),
            other => Err(PyramidError::InvalidOption {
                field: "format",
                reason: format!("unknown export format '{}'", other),
            }),
        }
    }
}

/// Download name for a chart: the first word of the title plus a suffix.
///
/// # Examples
/// ```
/// use popyramid::downloader::{ExportFormat, export_file_name};
///
/// assert_eq!(
///     export_file_name("1953 Shanghai census", ExportFormat::Png),
///     "1953_pyramid.png"
/// );
/// assert_eq!(export_file_name("   ", ExportFormat::Svg), "chart_pyramid.svg");
/// ```
pub fn export_file_name(title: &str, format: ExportFormat) -> String {
    let base: String = title
        .split_whitespace()
        .next()
        .unwrap_or("chart")
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '"') { '_' } else { c })
        .collect();
    format!("{}_pyramid.{}", base, format.extension())
}

/// One encoded chart, ready to be sent as a download.
#[derive(Clone, Debug)]
pub struct ExportedFile {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// Encode a rendered chart in the requested format
///
/// # Arguments
/// * `svg` - Chart as produced by [`crate::graph::create_pyramid_chart`] at
///   the base pixel size
/// * `title` - Chart title, used for the file name
/// * `settings` - Export settings the SVG was rendered with
/// * `format` - Output format
pub fn export_chart(
    svg: &str,
    title: &str,
    settings: &ExportSettings,
    format: ExportFormat,
) -> Result<ExportedFile> {
    let bytes = match format {
        ExportFormat::Svg => svg.as_bytes().to_vec(),
        ExportFormat::Pdf => to_pdf(svg)?,
        ExportFormat::Png => {
            let (width, height) = settings.png_size();
            to_png(svg, width, height, settings.png_scale())?
        }
    };

    let file_name = export_file_name(title, format);
    log::info!("exported {} ({} bytes)", file_name, bytes.len());

    Ok(ExportedFile {
        file_name,
        mime: format.mime(),
        bytes,
    })
}

/// Rasterize an SVG chart to PNG at `scale` times its nominal size.
pub fn to_png(svg: &str, width: u32, height: u32, scale: f64) -> Result<Vec<u8>> {
    use resvg::tiny_skia::{Pixmap, Transform};
    use resvg::usvg::{Options, Tree};

    let mut options = Options::default();
    options.fontdb = PNG_FONTS.clone();

    let tree = Tree::from_str(svg, &options)
        .map_err(|e| PyramidError::Export(format!("SVG parse failed: {}", e)))?;

    let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
        PyramidError::Export(format!("cannot allocate a {}x{} image", width, height))
    })?;
    let scale = scale as f32;
    resvg::render(
        &tree,
        Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );

    pixmap
        .encode_png()
        .map_err(|e| PyramidError::Export(format!("PNG encoding failed: {}", e)))
}

/// Convert an SVG chart to a single-page PDF of the same size.
pub fn to_pdf(svg: &str) -> Result<Vec<u8>> {
    use svg2pdf::usvg::{Options, Tree};
    use svg2pdf::{ConversionOptions, PageOptions};

    let mut options = Options::default();
    options.fontdb = PDF_FONTS.clone();

    let tree = Tree::from_str(svg, &options)
        .map_err(|e| PyramidError::Export(format!("SVG parse failed: {}", e)))?;

    svg2pdf::to_pdf(&tree, ConversionOptions::default(), PageOptions::default())
        .map_err(|e| PyramidError::Export(format!("PDF conversion failed: {}", e)))
}

/// Build an example workbook in the layout the upload form expects
///
/// Uses the default column names and the built-in sample bands, youngest
/// band in the last row.
pub fn sample_workbook() -> Result<Vec<u8>> {
    use rust_xlsxwriter::Workbook;

    let columns = ColumnMapping::default();
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (c, header) in columns.required().iter().enumerate() {
        worksheet.write_string(0, c as u16, *header)?;
    }
    for (r, (label, left, right)) in SAMPLE_BANDS.iter().enumerate() {
        let row = (r + 1) as u32;
        worksheet.write_string(row, 0, *label)?;
        worksheet.write_number(row, 1, *left)?;
        worksheet.write_number(row, 2, *right)?;
    }

    Ok(workbook.save_to_buffer()?)
}
