#![cfg(not(tarpaulin_include))]

use popyramid::downloader::{self, ExportFormat, ExportSettings};
use popyramid::graph::create_pyramid_chart;
use popyramid::options::ChartOptions;
use popyramid::pyramid::PyramidData;
use std::fs;
use std::path::Path;

/// Writes the built-in sample pyramid in every export format, plus the
/// example workbook, into `pyramid_output/`.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = Path::new("pyramid_output");
    fs::create_dir_all(output_dir)?;

    let options = ChartOptions::default();
    let settings = ExportSettings::default();
    let svg = create_pyramid_chart(&PyramidData::sample(), &options, settings.pixel_size())?;

    for format in [ExportFormat::Svg, ExportFormat::Pdf, ExportFormat::Png] {
        let file = downloader::export_chart(&svg, &options.title, &settings, format)?;
        let path = output_dir.join(&file.file_name);
        fs::write(&path, &file.bytes)?;
        println!("Created {} chart at {}", format.extension(), path.display());
    }

    let template = output_dir.join("pyramid_template.xlsx");
    fs::write(&template, downloader::sample_workbook()?)?;
    println!("Created example workbook at {}", template.display());

    Ok(())
}
