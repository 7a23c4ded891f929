use popyramid::downloader::{ExportFormat, ExportSettings, ExportUnit, export_chart};
use popyramid::graph::create_pyramid_chart;
use popyramid::loader::{load_table, load_table_from_path};
use popyramid::options::{ChartOptions, RenderConfig};
use popyramid::pyramid::PyramidData;
use popyramid::{PyramidError, Table};
use rust_xlsxwriter::Workbook;

// Writes a census-style workbook with the given header row and data rows.
fn workbook(headers: [&str; 3], rows: &[(&str, f64, f64)]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (c, header) in headers.iter().enumerate() {
        sheet.write_string(0, c as u16, *header).unwrap();
    }
    for (r, (age, left, right)) in rows.iter().enumerate() {
        let row = r as u32 + 1;
        sheet.write_string(row, 0, *age).unwrap();
        sheet.write_number(row, 1, *left).unwrap();
        sheet.write_number(row, 2, *right).unwrap();
    }
    workbook.save_to_buffer().unwrap()
}

fn load_pyramid(table: &Table) -> PyramidData {
    PyramidData::from_table(table, &ChartOptions::default().columns).unwrap()
}

#[test]
fn workbook_to_chart_to_every_format() {
    let bytes = workbook(
        ["Age group", "Male", "Female"],
        &[("10-14", 4.5, 4.1), ("5-9", 4.9, 4.6), ("0-4", 5.3, 4.9)],
    );
    let table = load_table("census.xlsx", &bytes).unwrap();
    let data = load_pyramid(&table);

    let scale = data.tick_scale().unwrap();
    assert_eq!(scale.values, vec![-6, -4, -2, 0, 2, 4, 6]);
    assert_eq!(scale.labels, vec!["6%", "4%", "2%", "0%", "2%", "4%", "6%"]);

    let config = RenderConfig::default();
    let svg = create_pyramid_chart(&data, &config.chart, config.export.pixel_size()).unwrap();

    let svg_file = export_chart(&svg, &config.chart.title, &config.export, ExportFormat::Svg).unwrap();
    assert_eq!(svg_file.file_name, "Population_pyramid.svg");
    assert_eq!(svg_file.bytes, svg.as_bytes());

    let pdf = export_chart(&svg, &config.chart.title, &config.export, ExportFormat::Pdf).unwrap();
    assert_eq!(pdf.mime, "application/pdf");
    assert!(pdf.bytes.starts_with(b"%PDF"));

    let png = export_chart(&svg, &config.chart.title, &config.export, ExportFormat::Png).unwrap();
    assert_eq!(png.file_name, "Population_pyramid.png");
    assert!(png.bytes.starts_with(b"\x89PNG"));
}

#[test]
fn csv_and_workbook_give_the_same_pyramid() {
    let rows = [("5-9", 4.9, 4.6), ("0-4", 5.3, 4.9)];
    let from_xlsx = load_table("census.xlsx", &workbook(["Age group", "Male", "Female"], &rows))
        .unwrap();
    let from_csv = load_table(
        "census.csv",
        b"Age group,Male,Female\n5-9,4.9,4.6\n0-4,5.3,4.9\n",
    )
    .unwrap();

    assert_eq!(load_pyramid(&from_xlsx), load_pyramid(&from_csv));
}

#[test]
fn missing_columns_stop_before_rendering() {
    let bytes = workbook(["Age", "Male", "Female"], &[("0-4", 5.3, 4.9)]);
    let table = load_table("census.xlsx", &bytes).unwrap();

    let err = PyramidData::from_table(&table, &ChartOptions::default().columns).unwrap_err();
    assert!(err.is_user_error());
    match err {
        PyramidError::MissingColumns { required, missing } => {
            assert_eq!(required, vec!["Age group", "Male", "Female"]);
            assert_eq!(missing, vec!["Age group"]);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn mm_export_sizes_follow_dpi() {
    let settings = ExportSettings {
        unit: ExportUnit::Mm,
        width_mm: 150.0,
        height_mm: 100.0,
        dpi: 300,
        ..ExportSettings::default()
    };
    settings.validate().unwrap();
    assert_eq!(settings.pixel_size(), (1772, 1181));
    assert_eq!(settings.png_scale(), 3.125);
    assert_eq!(settings.png_size(), (5538, 3691));
}

#[test]
fn sample_file_on_disk_renders() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.xlsx");
    std::fs::write(&path, popyramid::downloader::sample_workbook().unwrap()).unwrap();

    let table = load_table_from_path(&path).unwrap();
    let data = load_pyramid(&table);
    assert_eq!(data, PyramidData::sample());
    assert_eq!(data.tick_scale().unwrap().max, 8);

    let svg = create_pyramid_chart(&data, &ChartOptions::default(), (800, 600)).unwrap();
    assert!(svg.contains(">85+</text>"));
    assert!(svg.contains(">8%</text>"));
}
