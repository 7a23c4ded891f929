use crate::cell::CellValue;
use crate::error::{PyramidError, Result};
use crate::table::Table;
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use std::io::Cursor;
use std::path::Path;

/// Spreadsheet formats accepted by the upload form.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods", "csv"];

/// Load a table from CSV text
///
/// The first record holds the headers; each later record is one data row.
/// Quoted fields may contain commas, doubled quotes and line breaks. Records
/// with no values at all are skipped.
///
/// # Examples
/// ```
/// use popyramid::loader::from_csv;
///
/// let table = from_csv("Age,Male,Female\n0-4,5.3,4.9\n").unwrap();
/// assert_eq!(table.headers, vec!["Age", "Male", "Female"]);
/// assert_eq!(table.row_count(), 1);
/// ```
pub fn from_csv(text: &str) -> Result<Table> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader.records().filter(|record| match record {
        Ok(fields) => fields.iter().any(|field| !field.trim().is_empty()),
        Err(_) => true,
    });

    let headers: Vec<String> = records
        .next()
        .ok_or_else(|| PyramidError::Load("CSV file is empty".to_string()))??
        .iter()
        .map(String::from)
        .collect();

    let mut rows = Vec::new();
    for record in records {
        rows.push(record?.iter().map(CellValue::from_text).collect());
    }

    Ok(Table::new(headers, rows))
}

/// Load a table from the first worksheet of an Excel or OpenDocument workbook
///
/// The format (xlsx, xlsm, xls, ods) is sniffed from the bytes. Formula cells
/// contribute their cached values. Rows with no values at all are skipped.
pub fn from_excel(bytes: &[u8]) -> Result<Table> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

    // Get the first worksheet
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| PyramidError::Load("No sheets found in workbook".to_string()))?;

    let range = workbook.worksheet_range(&sheet_name)?;

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = sheet_rows
        .next()
        .ok_or_else(|| PyramidError::Load(format!("Worksheet '{}' is empty", sheet_name)))?
        .iter()
        .map(|cell| data_to_cell(cell).to_string())
        .collect();

    let rows = sheet_rows
        .map(|row| row.iter().map(data_to_cell).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|cell| !cell.is_empty()))
        .collect();

    Ok(Table::new(headers, rows))
}

fn data_to_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) if s.trim().is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Empty => CellValue::Empty,
        // Booleans, dates and error cells are shown as text; a value column
        // holding one of these fails numeric conversion later.
        other => CellValue::Text(other.to_string()),
    }
}

/// Detect the file type from its name and load the appropriate format
///
/// # Arguments
/// * `file_name` - Name of the uploaded file, used only for its extension
/// * `bytes` - File contents
///
/// # Examples
/// ```
/// use popyramid::loader::load_table;
///
/// assert!(load_table("data.txt", b"Age,Male,Female").is_err());
/// assert!(load_table("data.csv", b"Age,Male,Female\n0-4,1,2").is_ok());
/// ```
pub fn load_table(file_name: &str, bytes: &[u8]) -> Result<Table> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    let table = match extension.as_deref() {
        Some("csv") => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| PyramidError::Load(format!("CSV file is not UTF-8: {}", e)))?;
            from_csv(text)?
        }
        Some("xlsx") | Some("xlsm") | Some("xls") | Some("ods") => from_excel(bytes)?,
        Some(ext) => {
            return Err(PyramidError::Load(format!(
                "Unsupported file extension: {} (expected one of: {})",
                ext,
                SUPPORTED_EXTENSIONS.join(", ")
            )));
        }
        None => return Err(PyramidError::Load("File has no extension".to_string())),
    };

    log::debug!(
        "loaded '{}': {} columns, {} rows",
        file_name,
        table.headers.len(),
        table.row_count()
    );
    Ok(table)
}

/// Read a spreadsheet from disk and load it
///
/// # Examples
/// ```no_run
/// use popyramid::loader::load_table_from_path;
///
/// match load_table_from_path("census.xlsx") {
///     Ok(table) => println!("Loaded {} rows", table.row_count()),
///     Err(e) => eprintln!("Error loading file: {}", e),
/// }
/// ```
pub fn load_table_from_path(filepath: impl AsRef<Path>) -> Result<Table> {
    let path = filepath.as_ref();
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    load_table(name, &bytes)
}
